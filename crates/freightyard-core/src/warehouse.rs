//! Warehouse resource model.
//!
//! A [`Warehouse`] declares the repositories it subscribes to and records the
//! result of the latest artifact discovery in its status.

use serde::{Deserialize, Serialize};

use crate::discovery::{DiscoveredArtifacts, ImageDiscoveryResult};
use crate::error::{Error, Result};

/// Default number of tags a selector returns per repository.
pub const DEFAULT_DISCOVERY_LIMIT: usize = 20;

/// Upper bound for the per-repository discovery limit.
pub const MAX_DISCOVERY_LIMIT: usize = 100;

/// Identity and generation of a namespaced resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Namespace the resource lives in.
    pub namespace: String,

    /// Resource name, unique within the namespace.
    pub name: String,

    /// Incremented on every spec change.
    #[serde(default)]
    pub generation: i64,
}

impl ObjectMeta {
    /// Creates metadata for a resource at generation 1.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            generation: 1,
        }
    }

    /// Sets the generation.
    #[must_use]
    pub const fn with_generation(mut self, generation: i64) -> Self {
        self.generation = generation;
        self
    }
}

/// A configured source of subscriptions whose discovery the controller computes.
///
/// # Examples
///
/// ```rust
/// use freightyard_core::{ImageSubscription, ObjectMeta, RepoSubscription, Warehouse};
///
/// let warehouse = Warehouse::new(ObjectMeta::new("team-a", "web"))
///     .with_subscription(RepoSubscription::image(ImageSubscription::new("example.com/web")));
///
/// assert!(warehouse.validate().is_ok());
/// assert_eq!(warehouse.image_subscriptions().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    /// Resource identity.
    pub metadata: ObjectMeta,

    /// Desired state.
    #[serde(default)]
    pub spec: WarehouseSpec,

    /// Observed state.
    #[serde(default)]
    pub status: WarehouseStatus,
}

impl Warehouse {
    /// Creates a Warehouse with an empty spec and status.
    #[must_use]
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            spec: WarehouseSpec::default(),
            status: WarehouseStatus::default(),
        }
    }

    /// Appends a subscription to the spec.
    #[must_use]
    pub fn with_subscription(mut self, subscription: RepoSubscription) -> Self {
        self.spec.subscriptions.push(subscription);
        self
    }

    /// Replaces the status.
    #[must_use]
    pub fn with_status(mut self, status: WarehouseStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Iterates over the image subscriptions in declared order.
    pub fn image_subscriptions(&self) -> impl Iterator<Item = &ImageSubscription> {
        self.spec.subscriptions.iter().filter_map(|s| s.image.as_ref())
    }

    /// Returns the previously discovered references for a repository, if any.
    #[must_use]
    pub fn previous_image_discovery(&self, repo_url: &str) -> Option<&ImageDiscoveryResult> {
        self.status
            .discovered_artifacts
            .as_ref()?
            .images
            .iter()
            .find(|result| result.repo_url == repo_url)
    }

    /// Validates metadata and subscriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or namespace is empty, or if a
    /// subscription does not declare exactly one repository kind.
    pub fn validate(&self) -> Result<()> {
        if self.metadata.name.is_empty() {
            return Err(Error::InvalidMetadata {
                reason: "name must not be empty".to_string(),
            });
        }
        if self.metadata.namespace.is_empty() {
            return Err(Error::InvalidMetadata {
                reason: "namespace must not be empty".to_string(),
            });
        }

        for (index, subscription) in self.spec.subscriptions.iter().enumerate() {
            subscription.validate(index)?;
        }

        Ok(())
    }
}

/// Desired state of a Warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseSpec {
    /// Repositories this Warehouse subscribes to.
    #[serde(default)]
    pub subscriptions: Vec<RepoSubscription>,
}

/// Observed state of a Warehouse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStatus {
    /// Generation the discovered artifacts were computed for.
    #[serde(default)]
    pub observed_generation: i64,

    /// Result of the latest successful discovery pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_artifacts: Option<DiscoveredArtifacts>,
}

impl WarehouseStatus {
    /// Records a successful discovery pass for the given generation.
    ///
    /// The previous result is replaced wholesale.
    pub fn record_discovery(&mut self, generation: i64, artifacts: DiscoveredArtifacts) {
        self.observed_generation = generation;
        self.discovered_artifacts = Some(artifacts);
    }
}

/// A single repository subscription. Exactly one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSubscription {
    /// Container image repository subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSubscription>,

    /// Git repository subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSubscription>,

    /// Helm chart repository subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSubscription>,
}

impl RepoSubscription {
    /// Creates an image subscription.
    #[must_use]
    pub fn image(subscription: ImageSubscription) -> Self {
        Self {
            image: Some(subscription),
            ..Self::default()
        }
    }

    /// Creates a Git subscription.
    #[must_use]
    pub fn git(repo_url: impl Into<String>) -> Self {
        Self {
            git: Some(GitSubscription {
                repo_url: repo_url.into(),
            }),
            ..Self::default()
        }
    }

    /// Creates a chart subscription.
    #[must_use]
    pub fn chart(repo_url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            chart: Some(ChartSubscription {
                repo_url: repo_url.into(),
                name: name.into(),
            }),
            ..Self::default()
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let kinds = [self.image.is_some(), self.git.is_some(), self.chart.is_some()]
            .iter()
            .filter(|set| **set)
            .count();
        if kinds != 1 {
            return Err(Error::InvalidSubscription {
                index,
                reason: format!("expected exactly one of image, git or chart, found {kinds}"),
            });
        }

        let repo_url = self
            .image
            .as_ref()
            .map(|s| s.repo_url.as_str())
            .or_else(|| self.git.as_ref().map(|s| s.repo_url.as_str()))
            .or_else(|| self.chart.as_ref().map(|s| s.repo_url.as_str()))
            .unwrap_or_default();
        if repo_url.trim().is_empty() {
            return Err(Error::InvalidSubscription {
                index,
                reason: "repoURL must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Strategy a selector uses to choose tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Newest tags by semantic version, optionally constrained.
    #[default]
    SemVer,
    /// Track the digest behind a single mutable tag.
    Digest,
    /// Newest tags by reverse lexical order.
    Lexical,
    /// Newest tags by image build date.
    NewestBuild,
}

impl SelectionStrategy {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SemVer => "SemVer",
            Self::Digest => "Digest",
            Self::Lexical => "Lexical",
            Self::NewestBuild => "NewestBuild",
        }
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription to a container image repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSubscription {
    /// Image repository reference (e.g., `ghcr.io/acme/web`).
    #[serde(rename = "repoURL")]
    pub repo_url: String,

    /// Tag selection strategy.
    #[serde(default)]
    pub image_selection_strategy: SelectionStrategy,

    /// Semver range for `SemVer`, or the mutable tag to track for `Digest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,

    /// Require full `major.minor.patch` versions for `SemVer`.
    #[serde(default = "default_true")]
    pub strict_semvers: bool,

    /// Regular expression tags must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_tags: Option<String>,

    /// Tags that are never selected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_tags: Vec<String>,

    /// Target platform (`os/arch[/variant]`) for multi-arch images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Maximum number of tags to discover.
    #[serde(default = "default_discovery_limit")]
    pub discovery_limit: usize,

    /// Skip TLS verification when talking to the registry.
    #[serde(default, rename = "insecureSkipTLSVerify")]
    pub insecure_skip_tls_verify: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_discovery_limit() -> usize {
    DEFAULT_DISCOVERY_LIMIT
}

impl ImageSubscription {
    /// Creates a `SemVer` subscription with default settings.
    #[must_use]
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            image_selection_strategy: SelectionStrategy::default(),
            constraint: None,
            strict_semvers: true,
            allow_tags: None,
            ignore_tags: Vec::new(),
            platform: None,
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
            insecure_skip_tls_verify: false,
        }
    }

    /// Sets the selection strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.image_selection_strategy = strategy;
        self
    }

    /// Sets the constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Sets the allow-tags pattern.
    #[must_use]
    pub fn with_allow_tags(mut self, pattern: impl Into<String>) -> Self {
        self.allow_tags = Some(pattern.into());
        self
    }

    /// Adds a tag to the ignore list.
    #[must_use]
    pub fn with_ignored_tag(mut self, tag: impl Into<String>) -> Self {
        self.ignore_tags.push(tag.into());
        self
    }

    /// Sets the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Sets the discovery limit.
    #[must_use]
    pub const fn with_discovery_limit(mut self, limit: usize) -> Self {
        self.discovery_limit = limit;
        self
    }

    /// Returns the discovery limit clamped to `1..=MAX_DISCOVERY_LIMIT`.
    #[must_use]
    pub fn effective_discovery_limit(&self) -> usize {
        self.discovery_limit.clamp(1, MAX_DISCOVERY_LIMIT)
    }
}

/// Subscription to a Git repository. Not processed by image discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSubscription {
    /// Repository URL.
    #[serde(rename = "repoURL")]
    pub repo_url: String,
}

/// Subscription to a Helm chart. Not processed by image discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSubscription {
    /// Chart repository URL.
    #[serde(rename = "repoURL")]
    pub repo_url: String,

    /// Chart name.
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveredImageReference;

    fn warehouse() -> Warehouse {
        Warehouse::new(ObjectMeta::new("test-namespace", "test-warehouse"))
            .with_subscription(RepoSubscription::image(ImageSubscription::new(
                "example.com/my-image",
            )))
            .with_subscription(RepoSubscription::git("https://github.com/acme/config"))
    }

    #[test]
    fn test_image_subscriptions_skip_other_kinds() {
        let wh = warehouse();
        let repos: Vec<&str> = wh.image_subscriptions().map(|s| s.repo_url.as_str()).collect();
        assert_eq!(repos, vec!["example.com/my-image"]);
    }

    #[test]
    fn test_validate_rejects_multiple_kinds() {
        let mut sub = RepoSubscription::git("https://github.com/acme/config");
        sub.image = Some(ImageSubscription::new("example.com/my-image"));
        let wh = Warehouse::new(ObjectMeta::new("ns", "wh")).with_subscription(sub);

        let err = wh.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSubscription { index: 0, .. }));
    }

    #[test]
    fn test_validate_rejects_empty_repo_url() {
        let wh = Warehouse::new(ObjectMeta::new("ns", "wh"))
            .with_subscription(RepoSubscription::image(ImageSubscription::new("  ")));
        assert!(wh.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_namespace() {
        let wh = Warehouse::new(ObjectMeta::new("", "wh"));
        assert!(matches!(wh.validate(), Err(Error::InvalidMetadata { .. })));
    }

    #[test]
    fn test_previous_image_discovery() {
        let mut wh = warehouse();
        assert!(wh.previous_image_discovery("example.com/my-image").is_none());

        wh.status.record_discovery(
            1,
            DiscoveredArtifacts::new(vec![ImageDiscoveryResult::new(
                "example.com/my-image",
                None,
            )
            .with_references(vec![DiscoveredImageReference::new("v1.0.0")])]),
        );

        let previous = wh.previous_image_discovery("example.com/my-image").unwrap();
        assert_eq!(previous.references.len(), 1);
        assert!(wh.previous_image_discovery("example.com/other").is_none());
        assert_eq!(wh.status.observed_generation, 1);
    }

    #[test]
    fn test_subscription_defaults_from_yaml() {
        let yaml = r"
repoURL: ghcr.io/acme/web
";
        let sub: ImageSubscription = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sub.image_selection_strategy, SelectionStrategy::SemVer);
        assert!(sub.strict_semvers);
        assert_eq!(sub.discovery_limit, DEFAULT_DISCOVERY_LIMIT);
        assert!(!sub.insecure_skip_tls_verify);
    }

    #[test]
    fn test_effective_discovery_limit_clamps() {
        let sub = ImageSubscription::new("r").with_discovery_limit(0);
        assert_eq!(sub.effective_discovery_limit(), 1);
        let sub = ImageSubscription::new("r").with_discovery_limit(500);
        assert_eq!(sub.effective_discovery_limit(), MAX_DISCOVERY_LIMIT);
    }

    #[test]
    fn test_warehouse_yaml_document() {
        let yaml = r"
metadata:
  namespace: team-a
  name: web
  generation: 3
spec:
  subscriptions:
    - image:
        repoURL: ghcr.io/acme/web
        imageSelectionStrategy: NewestBuild
        allowTags: '^main-'
        platform: linux/amd64
    - git:
        repoURL: https://github.com/acme/web-config
status:
  observedGeneration: 2
";
        let wh: Warehouse = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wh.metadata.generation, 3);
        assert_eq!(wh.status.observed_generation, 2);
        assert!(wh.status.discovered_artifacts.is_none());

        let image = wh.image_subscriptions().next().unwrap();
        assert_eq!(image.image_selection_strategy, SelectionStrategy::NewestBuild);
        assert_eq!(image.platform.as_deref(), Some("linux/amd64"));
        assert!(wh.validate().is_ok());
    }
}
