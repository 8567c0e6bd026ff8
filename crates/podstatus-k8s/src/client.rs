//! Kubernetes client for podstatus

use anyhow::{Context, Result, bail};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

/// Kubernetes client wrapper
pub struct KubeClient {
    /// `None` when running inside a cluster without a kubeconfig
    kubeconfig: Option<Kubeconfig>,
    current_context: Option<String>,
}

impl KubeClient {
    /// Create a new KubeClient by loading the kubeconfig
    pub fn new() -> Self {
        match Kubeconfig::read() {
            Ok(kubeconfig) => {
                let current_context = kubeconfig.current_context.clone();
                Self {
                    kubeconfig: Some(kubeconfig),
                    current_context,
                }
            }
            Err(e) => {
                debug!(error = %e, "no kubeconfig, falling back to in-cluster config");
                Self {
                    kubeconfig: None,
                    current_context: None,
                }
            }
        }
    }

    /// Get the current context name
    pub fn current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    /// Namespace configured for a context (the current one if `None`)
    pub fn context_namespace(&self, context: Option<&str>) -> Option<String> {
        let kubeconfig = self.kubeconfig.as_ref()?;
        let name = context.or(self.current_context.as_deref())?;
        kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
    }

    /// Create a kube::Client for a specific context (the current one if `None`)
    pub async fn client(&self, context: Option<&str>) -> Result<kube::Client> {
        let config = match &self.kubeconfig {
            Some(kubeconfig) => {
                if let Some(name) = context
                    && !kubeconfig.contexts.iter().any(|c| c.name == name)
                {
                    bail!("Context '{}' not found in kubeconfig", name);
                }

                kube::Config::from_custom_kubeconfig(
                    kubeconfig.clone(),
                    &KubeConfigOptions {
                        context: context.map(str::to_string),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context.or(self.current_context()).unwrap_or("<current>")
                ))?
            }
            None => {
                if let Some(name) = context {
                    bail!("Context '{}' requested but no kubeconfig could be read", name);
                }
                kube::Config::incluster()
                    .context("Failed to read kubeconfig and not running inside a cluster")?
            }
        };

        kube::Client::try_from(config).context("Failed to create Kubernetes client")
    }
}

impl Default for KubeClient {
    fn default() -> Self {
        Self::new()
    }
}
