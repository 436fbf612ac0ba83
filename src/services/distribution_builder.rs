//! Distribution model construction
//!
//! Turns an aggregated group into the desired [`DistributionModel`]. The model
//! is a pure function of the group members, the configuration and the
//! certificates in the directory.

use crate::config::EngineConfig;
use crate::domain::{
    Behavior, DistributionIdentity, DistributionModel, LoggingConfig, Origin, RouteDescriptor,
    TlsConfig,
};
use crate::errors::{EdgeplaneError, Result};
use crate::services::certificate_matcher::CertificateMatcher;
use crate::services::group_aggregator::AggregatedGroup;
use crate::services::{path_pattern, specificity};
use crate::storage::CertificateRepository;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Tag value written under the managed tag key
pub const MANAGED_TAG_VALUE: &str = "edgeplane";

/// Builds distribution models for aggregated groups.
pub struct DistributionModelBuilder<'a> {
    config: &'a EngineConfig,
    certificates: &'a dyn CertificateRepository,
}

impl<'a> DistributionModelBuilder<'a> {
    pub fn new(config: &'a EngineConfig, certificates: &'a dyn CertificateRepository) -> Self {
        Self { config, certificates }
    }

    /// Build the desired model of `group`, attaching the existing backend identity.
    #[instrument(skip(self, group, identity), fields(group = %group.group, members = group.members.len()), name = "build_distribution")]
    pub async fn build(
        &self,
        group: &AggregatedGroup,
        identity: Option<DistributionIdentity>,
    ) -> Result<DistributionModel> {
        let alternate_domains = collect_alternate_domains(&group.members);
        let origins = build_origins(&group.members)?;

        // A group without alternate domains serves on the backend's own name.
        let tls = if self.config.tls.enabled && !alternate_domains.is_empty() {
            let certificate =
                CertificateMatcher::new(self.certificates).find(&alternate_domains).await?;
            debug!(certificate_arn = %certificate.arn, "Certificate selected");
            Some(TlsConfig {
                certificate_arn: certificate.arn,
                security_policy: self.config.tls.security_policy.clone(),
                ssl_support_method: self.config.tls.ssl_support_method.clone(),
            })
        } else {
            None
        };

        let logging = self.config.logging.enabled.then(|| LoggingConfig {
            bucket: self.config.logging.bucket.clone(),
            prefix: self.config.log_prefix_for(group.group.as_str()),
        });

        let model = DistributionModel {
            group: group.group.clone(),
            description: self.config.description_for(group.group.as_str()),
            default_origin: Origin::new(&self.config.default_origin_host),
            origins,
            alternate_domains,
            tls,
            web_acl_id: group.shared.web_acl_id.clone(),
            tags: self.merge_tags(group),
            logging,
            ipv6_enabled: self.config.ipv6_enabled,
            identity,
        };

        debug!(
            origins = model.origins.len(),
            alternate_domains = model.alternate_domains.len(),
            exists = model.exists(),
            "Distribution model built"
        );

        Ok(model)
    }

    /// Managed < group < descriptor < custom; later writers win per key.
    fn merge_tags(&self, group: &AggregatedGroup) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert(self.config.managed_tag_key.clone(), MANAGED_TAG_VALUE.to_string());
        tags.insert(self.config.group_tag_key.clone(), group.group.to_string());
        for member in &group.members {
            tags.extend(member.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        tags.extend(self.config.custom_tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }
}

fn collect_alternate_domains(members: &[RouteDescriptor]) -> Vec<String> {
    members
        .iter()
        .flat_map(|member| member.alternate_domains.iter())
        .map(|domain| domain.trim().to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Origins keyed by host, each with its behaviors most specific first.
///
/// Path patterns are global to the distribution: one pattern can only route
/// one way. Identical duplicates collapse.
fn build_origins(members: &[RouteDescriptor]) -> Result<Vec<Origin>> {
    let mut origins: BTreeMap<String, Origin> = BTreeMap::new();
    let mut seen: HashMap<String, Behavior> = HashMap::new();

    for member in members {
        let origin = origins
            .entry(member.origin_host.clone())
            .or_insert_with(|| Origin::new(&member.origin_host));

        match (origin.response_timeout, member.origin_response_timeout) {
            (Some(current), Some(requested)) if current != requested => {
                return Err(EdgeplaneError::build(format!(
                    "origin '{}' has conflicting response timeouts {}s and {}s",
                    member.origin_host, current, requested
                )));
            }
            (None, requested) => origin.response_timeout = requested,
            _ => {}
        }

        let mut patterns = path_pattern::translate_all(&member.paths);
        specificity::sort_most_specific_first(&mut patterns);

        for pattern in patterns {
            let behavior = Behavior {
                path_pattern: pattern.clone(),
                target_origin: member.origin_host.clone(),
                function_associations: member.function_associations.clone(),
                origin_request_policy_id: member.origin_request_policy_id.clone(),
                cache_policy_id: member.cache_policy_id.clone(),
            };

            match seen.get(&pattern) {
                Some(existing) if *existing == behavior => continue,
                Some(existing) => {
                    return Err(EdgeplaneError::build(format!(
                        "path pattern '{}' is routed by '{}' to origin '{}' with settings that conflict with origin '{}'",
                        pattern, member.reference, behavior.target_origin, existing.target_origin
                    )));
                }
                None => {
                    seen.insert(pattern, behavior.clone());
                    origin.behaviors.push(behavior);
                }
            }
        }
    }

    let mut origins: Vec<Origin> = origins.into_values().collect();
    for origin in &mut origins {
        origin
            .behaviors
            .sort_by(|a, b| specificity::compare(&a.path_pattern, &b.path_pattern));
    }
    Ok(origins)
}
