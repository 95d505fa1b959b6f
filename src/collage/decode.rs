use std::sync::Arc;

use image::DynamicImage;
use tokio::task::JoinHandle;

use super::CollageError;

pub fn decode_one(index: usize, bytes: &[u8]) -> Result<DynamicImage, CollageError> {
    image::load_from_memory(bytes).map_err(|err| CollageError::DecodeError {
        index,
        reason: err.to_string(),
    })
}

/// Decode every buffer on the blocking pool and join the results in input order.
///
/// Decodes may finish in any order; the returned vector always follows capture order.
/// Every task is awaited before an error is reported, so nothing is left running.
pub async fn decode_all(buffers: &[Arc<[u8]>]) -> Result<Vec<DynamicImage>, CollageError> {
    let handles: Vec<JoinHandle<Result<DynamicImage, CollageError>>> = buffers
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            let bytes = Arc::clone(bytes);
            tokio::task::spawn_blocking(move || decode_one(index, &bytes))
        })
        .collect();

    let mut decoded = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(CollageError::DecodeError {
                index,
                reason: format!("decode worker failed: {join_err}"),
            }),
        };
        match outcome {
            Ok(image) => decoded.push(image),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(decoded),
    }
}
