use connectors::error::DeliveryError;
use engine_core::retry::RetryDisposition;

/// Maps a classified delivery error to a retry disposition. Rate limits,
/// server errors and transport failures arrive as `Retryable`; everything
/// else stops the call.
pub fn classify_delivery_error(err: &DeliveryError) -> RetryDisposition {
    match err {
        DeliveryError::Retryable(_) => RetryDisposition::Retry,
        DeliveryError::Fatal(_) => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_maps_to_retry_and_fatal_to_stop() {
        assert_eq!(
            classify_delivery_error(&DeliveryError::Retryable("429".into())),
            RetryDisposition::Retry
        );
        assert_eq!(
            classify_delivery_error(&DeliveryError::Fatal("404".into())),
            RetryDisposition::Stop
        );
    }
}
