use super::headers::WebhookHeaders;
use super::outcome::{FailureKind, VerificationOutcome};
use super::provider::Provider;
use crate::config::{PipelineConfig, ProviderConfig};

/// Pick the provider a webhook came from by its signature header
///
/// Providers are tried in [`Provider::DETECTION_ORDER`]. Only providers with
/// secret material configured take part: a header belonging to an
/// unconfigured provider is ignored, and a webhook that matches no configured
/// provider fails with `UNKNOWN_PROVIDER` and no provider set.
pub fn detect_provider<'a>(
    headers: &WebhookHeaders,
    config: &'a PipelineConfig,
) -> Result<(Provider, &'a ProviderConfig), VerificationOutcome> {
    config
        .configured_providers()
        .find(|(provider, provider_config)| {
            headers.contains(provider_config.signature_header_for(*provider))
        })
        .ok_or_else(|| {
            VerificationOutcome::failure(
                None,
                FailureKind::UnknownProvider,
                "No configured webhook provider matched the request headers",
            )
        })
}
