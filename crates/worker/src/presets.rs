//! Descriptor sources: the built-in seal-logo set and JSON batch files.

use std::path::{Path, PathBuf};

use inkseal_core::descriptor::JobDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to read batch file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid batch file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch file {} contains no jobs", .path.display())]
    Empty { path: PathBuf },
}

/// The four seal-logo variants rendered when no batch file is given.
pub fn builtin_descriptors() -> Vec<JobDescriptor> {
    vec![
        JobDescriptor::new(
            "idiom_logo_v1",
            90101,
            "app icon, traditional East Asian red seal stamp on deep red background, \
             white carved stone seal with Chinese character, ink brush calligraphy, \
             minimal flat illustration, centered, no text",
            "a premium mobile app icon on solid deep red background hex B91C1C, \
             a beautiful traditional East Asian square seal stamp in the center, \
             the seal is carved from white jade or cream colored stone, \
             inside the seal there is an abstract bold Chinese calligraphy character, \
             the seal has a classic square shape with slightly rounded edges, \
             carved red lines inside the white seal creating traditional seal art, \
             a subtle ink splash or brush stroke accent near the seal, \
             the overall mood is elegant traditional scholarly like an ancient study room, \
             flat minimal vector illustration style, clean bold shapes, \
             premium luxury brand feel, \
             perfectly centered in the square icon, no text no letters no words",
        ),
        JobDescriptor::new(
            "idiom_logo_v2",
            90202,
            "app icon, red Chinese seal stamp impression on crimson background, \
             traditional ink seal mark, elegant calligraphy, \
             minimal flat design, premium, no text",
            "a square app icon with solid deep crimson red background hex B91C1C, \
             featuring a single traditional Chinese seal stamp impression at center, \
             the seal impression is in cream white hex FFFDF7 color, \
             it shows an abstract carved Chinese character inside a square border, \
             the seal looks like it was pressed with red ink on paper, \
             a small decorative scroll curl element below the seal, \
             subtle ink brush texture in the background, \
             the feeling is of a traditional scholar study room with calligraphy and ink, \
             flat illustration style with clean precise vector shapes, \
             luxury premium app branding quality, \
             looks beautiful and recognizable at sizes from 512px to 48px, \
             no text no typography no letters, perfectly centered in square format",
        ),
        JobDescriptor::new(
            "idiom_logo_v3",
            90303,
            "app icon, traditional Korean ink stone and brush on deep red background, \
             ink well with black ink, calligraphy brush, scroll paper, \
             minimal flat art, premium, no text",
            "a minimalist yet elegant app icon, solid deep red background hex B91C1C, \
             a traditional East Asian ink stone or ink well in the center, \
             the ink stone is dark black hex 1C1917 with a pool of glistening black ink, \
             next to it a calligraphy brush with cream colored handle, \
             a rolled scroll paper in warm ivory color partially visible, \
             the overall composition suggests traditional calligraphy and scholarship, \
             colors are deep red, black ink, warm cream, and white, \
             this represents a daily Chinese idiom learning app, \
             flat clean vector art style, bold simple shapes, \
             designed to look premium and elegant at any size, \
             no text no words, solid color background, square format",
        ),
        JobDescriptor::new(
            "idiom_logo_v4",
            90404,
            "app icon, red square seal stamp with bold character, deep red background, \
             traditional East Asian chop seal, premium minimal flat design, no text",
            "a premium brand app icon, solid dark red background hex B91C1C, \
             a central white square traditional East Asian chop seal stamp, \
             the seal stamp is cream white hex FFFDF7 with carved bold strokes inside, \
             inside the seal are abstract bold geometric strokes resembling Chinese character, \
             the strokes are in deep red hex B91C1C creating a classic seal carving look, \
             the seal has a thin decorative border frame, \
             below the seal a tiny decorative ink drop or splash in black, \
             around the seal subtle warm glow suggesting old paper and candlelight, \
             the whole composition evokes traditional scholarly culture and wisdom, \
             flat illustration style with clean precise vector shapes, \
             luxury premium app branding quality, \
             looks beautiful and recognizable at sizes from 512px to 48px, \
             no text no letters, perfectly centered in square format",
        ),
    ]
}

/// Read a JSON array of descriptors from `path`.
///
/// Entries are not validated here; the coordinator reports invalid
/// descriptors per item so one bad entry does not abort the file.
pub fn load_descriptors(path: &Path) -> Result<Vec<JobDescriptor>, PresetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptors: Vec<JobDescriptor> =
        serde_json::from_str(&raw).map_err(|source| PresetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if descriptors.is_empty() {
        return Err(PresetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(descriptors)
}

/// The batch file's descriptors when one is configured, else the built-ins.
pub fn resolve(batch_file: Option<&Path>) -> Result<Vec<JobDescriptor>, PresetError> {
    match batch_file {
        Some(path) => load_descriptors(path),
        None => Ok(builtin_descriptors()),
    }
}
