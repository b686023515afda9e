use crate::{
    core::{GlooEdgeRouter, RolloutContext, TrafficRouter},
    k8s::{Api, Client, Rollout},
    store::KubeStore,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::time;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "glooedge-traffic-router",
    about = "Shifts rollout traffic between Gloo Edge destinations"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "glooedge=info,warn",
        env = "GLOOEDGE_ROUTER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "GLOOEDGE_ROUTER_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    /// Bounds the whole operation, including all API calls.
    #[clap(long, default_value = "10000")]
    timeout_ms: u64,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Sends a percentage of the rollout's traffic to its canary service.
    SetWeight(Target),

    /// Checks whether the routing objects already carry a weight.
    VerifyWeight(Target),
}

#[derive(Debug, clap::Args)]
struct Target {
    /// Namespace of the rollout
    #[clap(long, short = 'n')]
    namespace: String,

    /// Name of the rollout
    #[clap(long)]
    rollout: String,

    /// Canary weight, as a percentage of traffic
    #[clap(long, allow_negative_numbers = true)]
    weight: i32,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            timeout_ms,
            command,
        } = self;

        log_format.try_init(log_level)?;

        let client = client
            .try_client()
            .await
            .context("failed to configure Kubernetes client")?;

        time::timeout(
            time::Duration::from_millis(timeout_ms),
            command.run(client),
        )
        .await
        .with_context(|| format!("timed out after {timeout_ms}ms"))?
    }
}

// === impl Command ===

impl Command {
    async fn run(self, client: Client) -> Result<()> {
        let (Self::SetWeight(target) | Self::VerifyWeight(target)) = &self;
        let rollout = target.rollout(client.clone()).await?;
        let router = GlooEdgeRouter::new(KubeStore::new(client.clone()), KubeStore::new(client));

        match self {
            Self::SetWeight(Target { weight, .. }) => {
                router.set_weight(&rollout, weight).await?;
                info!(
                    namespace = %rollout.namespace,
                    rollout = %rollout.name,
                    weight,
                    router = router.type_name(),
                    "Updated canary weight"
                );
            }
            Self::VerifyWeight(Target { weight, .. }) => {
                if !router.verify_weight(&rollout, weight).await? {
                    warn!(
                        namespace = %rollout.namespace,
                        rollout = %rollout.name,
                        weight,
                        "Canary weight not yet applied"
                    );
                    bail!("canary weight {weight} is not applied");
                }
                info!(
                    namespace = %rollout.namespace,
                    rollout = %rollout.name,
                    weight,
                    "Verified canary weight"
                );
            }
        }
        Ok(())
    }
}

// === impl Target ===

impl Target {
    async fn rollout(&self, client: Client) -> Result<RolloutContext> {
        let rollout = Api::<Rollout>::namespaced(client, &self.namespace)
            .get(&self.rollout)
            .await
            .with_context(|| format!("failed to get rollout {}/{}", self.namespace, self.rollout))?;
        Ok(RolloutContext::from_rollout(&rollout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_weight() {
        let args = Args::try_parse_from([
            "glooedge-traffic-router",
            "set-weight",
            "-n",
            "apps",
            "--rollout",
            "web",
            "--weight",
            "25",
        ])
        .unwrap();
        assert_eq!(args.timeout_ms, 10_000);
        let Command::SetWeight(target) = args.command else {
            panic!("expected set-weight");
        };
        assert_eq!(target.namespace, "apps");
        assert_eq!(target.rollout, "web");
        assert_eq!(target.weight, 25);
    }

    #[test]
    fn requires_weight() {
        assert!(Args::try_parse_from([
            "glooedge-traffic-router",
            "verify-weight",
            "--namespace",
            "apps",
            "--rollout",
            "web",
        ])
        .is_err());
    }
}
