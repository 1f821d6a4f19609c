use crate::core::{
    config::{HollaexConfig, StreamConfig},
    errors::HollaexError,
    kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, Signer},
};
use crate::exchanges::hollaex::{
    rest::HollaexRest,
    signer::HollaexSigner,
    stream::{AuthQueryBuilder, StreamClient},
    VENUE,
};
use std::sync::Arc;
use tracing::debug;

fn signer_for(config: &HollaexConfig) -> Option<Arc<dyn Signer>> {
    config.has_credentials().then(|| {
        Arc::new(HollaexSigner::new(
            config.api_key().to_string(),
            config.api_secret().to_string(),
        )) as Arc<dyn Signer>
    })
}

/// Create the HollaEx REST client
///
/// Signs private endpoints when the configuration carries credentials; without
/// them only public endpoints succeed.
pub fn build_rest_client(config: &HollaexConfig) -> Result<HollaexRest<ReqwestRest>, HollaexError> {
    let rest_config = RestClientConfig::new(
        config.api_url.clone(),
        config.base_path.clone(),
        VENUE.to_string(),
    )
    .with_timeout(30)
    .with_expires_after(config.expires_window());

    let mut rest_builder = RestClientBuilder::new(rest_config);

    if let Some(signer) = signer_for(config) {
        rest_builder = rest_builder.with_signer(signer);
    }

    let rest = rest_builder.build()?;
    debug!(authenticated = rest.has_signer(), "HollaEx REST client ready");
    Ok(HollaexRest::new(rest))
}

/// URL builder for the stream handshake, authenticated when credentials exist
pub fn build_auth_query(config: &HollaexConfig) -> AuthQueryBuilder {
    let mut auth = AuthQueryBuilder::new(config.stream_url.clone())
        .with_expires_after(config.expires_window());

    if let Some(signer) = signer_for(config) {
        auth = auth.with_signer(signer);
    }
    auth
}

/// Create the HollaEx stream client over the real websocket transport
///
/// Must be called from within a tokio runtime.
pub fn build_stream_client(config: &HollaexConfig, stream_config: StreamConfig) -> StreamClient {
    StreamClient::new(build_auth_query(config), stream_config)
}
