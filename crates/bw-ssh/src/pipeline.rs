//! The full run: unlock, load the catalog, provision every item

use bw_ssh_core::Paths;
use tracing::info;

use crate::catalog::CatalogLoader;
use crate::client::VaultClient;
use crate::error::Result;
use crate::prompt::CredentialSource;
use crate::provision::{KeyAgent, Provisioner, Report};
use crate::session::Authenticator;

/// Everything one run needs
pub struct Pipeline<'a, C, A> {
    pub client: &'a C,
    pub credentials: &'a dyn CredentialSource,
    pub agent: &'a A,
    pub paths: &'a Paths,
    /// Vault folder holding the SSH items
    pub folder: &'a str,
}

impl<C: VaultClient, A: KeyAgent> Pipeline<'_, C, A> {
    pub async fn run(&self) -> Result<Report> {
        let session = Authenticator::new(self.client, self.credentials)
            .authenticate()
            .await?;
        let client = self.client.with_session(&session);

        let catalog = CatalogLoader::new(&client).resolve(self.folder).await?;
        info!(folder = self.folder, items = catalog.len(), "provisioning");

        Provisioner::new(self.agent, self.paths)
            .provision_all(&catalog)
            .await
    }
}
