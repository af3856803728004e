use migrator_engine::{Connection, Connector, Credentials, PlatformError, PlatformErrorKind};

/// Refuses every credential pair, like a platform that does not know the app.
pub struct RejectingConnector;

#[async_trait::async_trait]
impl Connector for RejectingConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Box<dyn Connection>, PlatformError> {
        Err(PlatformError::new(
            PlatformErrorKind::Unauthorized,
            "API_ID_INVALID",
        ))
    }
}
