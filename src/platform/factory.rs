//! Service selection by provider type

use crate::collect::Collected;
use crate::error::{Error, Result};
use crate::platform::{GitHubService, HarnessHttpApi, HarnessService, OctocrabApi, ScmService};
use crate::types::{Provider, ProviderType};
use std::sync::Arc;
use url::Url;

/// Create the service for a stored provider
pub fn create_service(provider: &Provider) -> Result<Arc<dyn ScmService>> {
    let pat = &provider.identity()?.pat;

    match provider.provider_type {
        ProviderType::GitHub => {
            let api = OctocrabApi::new(pat, &provider.host)?;
            Ok(Arc::new(GitHubService::new(provider.clone(), Arc::new(api))))
        }
        ProviderType::Harness => {
            let api = HarnessHttpApi::new(pat, &provider.host)?;
            Ok(Arc::new(HarnessService::new(provider.clone(), Arc::new(api))))
        }
    }
}

/// Create services for every provider
///
/// A provider whose service cannot be built contributes an error naming it
/// instead of a service.
pub fn create_services(providers: &[Provider]) -> Collected<Arc<dyn ScmService>> {
    let mut services = Collected::new();
    for provider in providers {
        match create_service(provider) {
            Ok(service) => services.items.push(service),
            Err(err) => services.errors.push(err.for_provider(&provider.name)),
        }
    }
    services
}

/// Normalize a user-supplied host URL
///
/// A missing scheme defaults to `https`; trailing slashes are removed.
pub fn normalize_host(host: &str) -> Result<String> {
    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidHost {
            host: host.to_string(),
            reason: "host is empty".to_string(),
        });
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| Error::InvalidHost {
        host: host.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidHost {
            host: host.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
