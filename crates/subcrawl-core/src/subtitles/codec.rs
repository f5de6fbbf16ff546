use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const COMPRESSED_SUFFIX: &str = ".gzip";

/// Base64 text to raw bytes. Line breaks inside the payload are ignored.
pub fn decode_base64(encoded: &str) -> io::Result<Vec<u8>> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Gzip and base64-encode subtitle content, the way the remote service ships it.
pub fn encode_subtitle(content: &[u8]) -> io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    Ok(STANDARD.encode(encoder.finish()?))
}

/// Inverse of `encode_subtitle`, in memory.
pub fn decode_subtitle(encoded: &str) -> io::Result<Vec<u8>> {
    let compressed = decode_base64(encoded)?;
    let mut content = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut content)?;
    Ok(content)
}

/// Write `<directory>/<file_name>.gzip`, decompress it to `<directory>/<file_name>`
/// and remove the compressed file. Returns the path of the subtitle.
pub fn write_subtitle(directory: &Path, file_name: &str, encoded: &str) -> io::Result<PathBuf> {
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid subtitle file name '{}'", file_name),
            )
        })?
        .to_string_lossy()
        .into_owned();

    let compressed_path = directory.join(format!("{}{}", name, COMPRESSED_SUFFIX));
    let subtitle_path = directory.join(&name);

    fs::write(&compressed_path, decode_base64(encoded)?)?;

    let result = decompress_file(&compressed_path, &subtitle_path);
    let removed = fs::remove_file(&compressed_path);
    result?;
    removed?;
    Ok(subtitle_path)
}

fn decompress_file(compressed_path: &Path, subtitle_path: &Path) -> io::Result<()> {
    let mut content = Vec::new();
    GzDecoder::new(File::open(compressed_path)?).read_to_end(&mut content)?;
    let mut out = File::create(subtitle_path)?;
    out.write_all(&content)
}
