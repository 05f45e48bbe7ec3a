use std::path::Path;

use uuid::Uuid;

use crate::{
    error::{Error, Result},
    mime::ImageKind,
};

const KEPT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Builds a fresh storage name for an upload. Only the client's extension
/// survives, and only when it is one we serve; otherwise the sniffed kind
/// decides.
pub fn storage_name(original: Option<&str>, kind: ImageKind) -> String {
    let extension = original
        .and_then(client_extension)
        .unwrap_or_else(|| kind.extension().to_string());
    format!("{}.{extension}", Uuid::new_v4())
}

fn client_extension(original: &str) -> Option<String> {
    // Clients on Windows send backslash-separated paths.
    let last = original.rsplit(['/', '\\']).next()?;
    let ext = Path::new(last).extension()?.to_str()?.to_ascii_lowercase();
    KEPT_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Checks that `name` has exactly the shape [`storage_name`] produces.
pub fn parse_storage_name(name: &str) -> Result<(Uuid, &str)> {
    let invalid = || Error::invalid("Invalid filename");

    let (stem, ext) = name.rsplit_once('.').ok_or_else(invalid)?;
    if !KEPT_EXTENSIONS.contains(&ext) {
        return Err(invalid());
    }
    let id = Uuid::try_parse(stem).map_err(|_| invalid())?;
    // try_parse also accepts braced, urn and simple forms
    if id.hyphenated().to_string() != stem {
        return Err(invalid());
    }
    Ok((id, ext))
}
