//! Per-domain set of discovery collections
//!
//! Groups the collections a discovery page works with. Long-read mNGS
//! samples and the AMR/benchmark workflow runs are separate collections
//! over the same endpoints, so their caches never mix.

use crate::client::DiscoveryClient;
use crate::domain::DiscoveryDomain;
use crate::entities::{Project, Sample, Visualization, WorkflowRun};
use discovery_collection::Collection;
use tracing::info;

/// Collections for one discovery domain
#[derive(Debug, Clone)]
pub struct DiscoveryDataLayer {
    domain: DiscoveryDomain,
    client: DiscoveryClient,
    /// Short-read samples
    pub samples: Collection<Sample>,
    /// Long-read mNGS samples
    pub long_read_mngs_samples: Collection<Sample>,
    /// Projects
    pub projects: Collection<Project>,
    /// Visualizations
    pub visualizations: Collection<Visualization>,
    /// AMR workflow runs
    pub amr_workflow_runs: Collection<WorkflowRun>,
    /// Benchmark workflow runs
    pub benchmark_workflow_runs: Collection<WorkflowRun>,
}

impl DiscoveryDataLayer {
    /// Create empty collections for `domain` backed by `client`
    #[must_use]
    pub fn new(domain: DiscoveryDomain, client: DiscoveryClient) -> Self {
        let name = domain.as_str();
        info!(domain = name, base_url = %client.base_url(), "creating discovery data layer");

        Self {
            samples: Collection::new(name, client.samples()),
            long_read_mngs_samples: Collection::new(name, client.samples()),
            projects: Collection::new(name, client.projects()),
            visualizations: Collection::new(name, client.visualizations()),
            amr_workflow_runs: Collection::new(name, client.workflow_runs()),
            benchmark_workflow_runs: Collection::new(name, client.workflow_runs()),
            domain,
            client,
        }
    }

    /// Domain every collection is scoped to
    #[inline]
    #[must_use]
    pub fn domain(&self) -> DiscoveryDomain {
        self.domain
    }

    /// Client the collections fetch through
    #[inline]
    #[must_use]
    pub fn client(&self) -> &DiscoveryClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use discovery_collection::Identifier;

    #[test]
    fn collections_share_domain_but_not_entries() {
        let client = DiscoveryClient::new(ApiConfig::new()).unwrap();
        let layer = DiscoveryDataLayer::new(DiscoveryDomain::Public, client);

        assert_eq!(layer.domain(), DiscoveryDomain::Public);
        assert_eq!(layer.samples.domain(), "public");
        assert_eq!(layer.benchmark_workflow_runs.domain(), "public");

        layer.samples.update(Sample::new(1));
        assert!(layer.samples.contains(&Identifier::Int(1)));
        assert!(layer.long_read_mngs_samples.is_empty());

        layer.amr_workflow_runs.update(WorkflowRun::new("wr"));
        assert!(layer.benchmark_workflow_runs.is_empty());
    }
}
