use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudfront::{
  types::{
    CookiePreference, DefaultCacheBehavior, DistributionConfig, EventType, ForwardedValues, ItemSelection,
    LambdaFunctionAssociation, LambdaFunctionAssociations, Origin, Origins, S3OriginConfig, TrustedSigners,
    ViewerProtocolPolicy,
  },
  Client,
};
use tracing::{debug, info};

use crate::{
  config::Settings,
  provider::{CacheBehaviorSpec, CdnAdmin, Distribution, DistributionSpec, FunctionAssociation, OriginSpec},
  sdk_error,
};

/// Lifecycle point at which the edge function runs: just before the request is forwarded to the origin
pub const ORIGIN_REQUEST_EVENT: &str = "origin-request";

const MIN_TTL: i64 = 10;
const VIEWER_PROTOCOL_POLICY: &str = "redirect-to-https";
const FORWARD_COOKIES: &str = "none";

/// Build the distribution fronting the origin bucket with the published function version
/// associated to origin requests
pub fn distribution_spec(settings: &Settings, version_arn: &str) -> DistributionSpec {
  DistributionSpec {
    caller_reference: settings.origin_bucket.to_owned(),
    comment: settings.origin_bucket.to_owned(),
    enabled: true,
    origin: OriginSpec {
      id: settings.origin_id.to_owned(),
      domain_name: settings.origin_domain_name(),
      origin_access_identity: String::new(),
    },
    default_cache_behavior: CacheBehaviorSpec {
      target_origin_id: settings.origin_id.to_owned(),
      min_ttl: MIN_TTL,
      compress: true,
      viewer_protocol_policy: VIEWER_PROTOCOL_POLICY.to_owned(),
      function_associations: vec![FunctionAssociation {
        function_arn: version_arn.to_owned(),
        event_type: ORIGIN_REQUEST_EVENT.to_owned(),
        include_body: false,
      }],
      forward_query_string: false,
      forward_cookies: FORWARD_COOKIES.to_owned(),
      trusted_signers_enabled: false,
    },
  }
}

/// Translate the distribution into the CloudFront API shape
///
/// CloudFront lists carry an explicit `Quantity` alongside their items. `MinTTL` and
/// `ForwardedValues` are legacy cache settings that the deployed distribution still relies on.
#[allow(deprecated)]
pub fn to_distribution_config(spec: &DistributionSpec) -> Result<DistributionConfig> {
  let origin = Origin::builder()
    .id(&spec.origin.id)
    .domain_name(&spec.origin.domain_name)
    .s3_origin_config(
      S3OriginConfig::builder()
        .origin_access_identity(&spec.origin.origin_access_identity)
        .build(),
    )
    .build()?;

  let behavior = &spec.default_cache_behavior;
  let associations = behavior
    .function_associations
    .iter()
    .map(|association| {
      LambdaFunctionAssociation::builder()
        .lambda_function_arn(&association.function_arn)
        .event_type(EventType::from(association.event_type.as_str()))
        .include_body(association.include_body)
        .build()
    })
    .collect::<Result<Vec<_>, _>>()?;

  let default_cache_behavior = DefaultCacheBehavior::builder()
    .target_origin_id(&behavior.target_origin_id)
    .min_ttl(behavior.min_ttl)
    .compress(behavior.compress)
    .viewer_protocol_policy(ViewerProtocolPolicy::from(behavior.viewer_protocol_policy.as_str()))
    .lambda_function_associations(
      LambdaFunctionAssociations::builder()
        .quantity(associations.len() as i32)
        .set_items(Some(associations))
        .build()?,
    )
    .forwarded_values(
      ForwardedValues::builder()
        .query_string(behavior.forward_query_string)
        .cookies(
          CookiePreference::builder()
            .forward(ItemSelection::from(behavior.forward_cookies.as_str()))
            .build()?,
        )
        .build()?,
    )
    .trusted_signers(
      TrustedSigners::builder()
        .enabled(behavior.trusted_signers_enabled)
        .quantity(0)
        .build()?,
    )
    .build()?;

  let config = DistributionConfig::builder()
    .caller_reference(&spec.caller_reference)
    .comment(&spec.comment)
    .enabled(spec.enabled)
    .origins(Origins::builder().quantity(1).items(origin).build()?)
    .default_cache_behavior(default_cache_behavior)
    .build()?;

  Ok(config)
}

#[async_trait]
impl CdnAdmin for Client {
  async fn create_distribution(&self, distribution: &DistributionSpec) -> Result<Distribution> {
    let config = to_distribution_config(distribution)?;

    let response = self
      .create_distribution()
      .distribution_config(config)
      .send()
      .await
      .map_err(sdk_error)?;

    let created = response.distribution().context("Distribution missing from response")?;
    Ok(Distribution {
      id: created.id().to_owned(),
      domain_name: created.domain_name().to_owned(),
    })
  }
}

/// Create the distribution invoking `version_arn` on origin requests
pub async fn create_distribution(admin: &dyn CdnAdmin, settings: &Settings, version_arn: &str) -> Result<Distribution> {
  let spec = distribution_spec(settings, version_arn);
  debug!("Distribution: {spec:#?}");

  let distribution = admin
    .create_distribution(&spec)
    .await
    .context("Could not create CDN")?;
  info!("Created distribution {} ({})", distribution.id, distribution.domain_name);

  Ok(distribution)
}
