use oauth2::{AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl, basic::BasicClient};

use crate::{AppResult, config::Config};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

/// The campus identity provider: an OAuth2 code-exchange endpoint pair plus
/// a userinfo URL for the profile fetch after the exchange.
#[derive(Clone)]
pub struct Clients {
    idp: HappyClient,
    pub(crate) userinfo_url: String,
}

impl Clients {
    pub fn from_config(config: &Config) -> AppResult<Clients> {
        let auth_url = AuthUrl::new(config.idp_auth_url.clone())
            .map_err(anyhow::Error::from)?;
        let token_url = TokenUrl::new(config.idp_token_url.clone())
            .map_err(anyhow::Error::from)?;
        let redirect_url = RedirectUrl::new(format!("{}/lockin", config.public_url))
            .map_err(anyhow::Error::from)?;

        let idp = BasicClient::new(ClientId::new(config.idp_client_id.clone()))
            .set_client_secret(ClientSecret::new(config.idp_client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        Ok(Clients {
            idp,
            userinfo_url: config.idp_userinfo_url.clone(),
        })
    }

    pub fn idp(&self) -> &HappyClient {
        &self.idp
    }
}
