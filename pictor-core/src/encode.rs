use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::{
    error::{Error, Result},
    mime::ImageKind,
    storage::Checkout,
};

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Reads a processed file into a data URI.
pub async fn encode_file(path: impl AsRef<Path>, kind: ImageKind) -> Result<String> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| Error::read(path, err))?;
    Ok(data_uri(kind.mime(), &bytes))
}

/// Encodes the processed file, then commits the checkout. If encoding fails
/// the checkout is dropped instead and the uploaded source is left alone.
pub async fn respond(checkout: Checkout, processed: &Path, kind: ImageKind) -> Result<String> {
    let payload = encode_file(processed, kind).await?;
    checkout.commit().await?;
    Ok(payload)
}
