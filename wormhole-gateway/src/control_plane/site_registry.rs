/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::error::RoutingError;
use std::collections::HashMap;

/// Site name → tunnel address of that site's gateway. Fixed once the gateway is built.
#[derive(Clone, Debug, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, String>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure_site(&mut self, site: impl Into<String>, tunnel_address: impl Into<String>) {
        self.sites.insert(site.into(), tunnel_address.into());
    }

    pub fn resolve(&self, site: &str) -> Option<&str> {
        self.sites.get(site).map(String::as_str)
    }

    /// Tunnel addresses for every site, or the full list of sites that have none.
    pub fn resolve_all<'a>(
        &self,
        sites: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<String>, RoutingError> {
        let mut addresses = Vec::new();
        let mut unresolved = Vec::new();

        for site in sites {
            match self.resolve(site) {
                Some(address) => addresses.push(address.to_string()),
                None => unresolved.push(site.to_string()),
            }
        }

        if unresolved.is_empty() {
            Ok(addresses)
        } else {
            Err(RoutingError::UnresolvedSites { sites: unresolved })
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SiteRegistry;
    use crate::error::RoutingError;

    #[test]
    fn resolve_all_reports_every_missing_site() {
        let mut registry = SiteRegistry::new();
        registry.configure_site("SiteB", "gateway-b");

        assert_eq!(
            registry.resolve_all(["SiteB"]),
            Ok(vec!["gateway-b".to_string()])
        );
        assert_eq!(
            registry.resolve_all(["SiteX", "SiteB", "SiteY"]),
            Err(RoutingError::UnresolvedSites {
                sites: vec!["SiteX".to_string(), "SiteY".to_string()]
            })
        );
    }

    #[test]
    fn later_configuration_overrides_earlier_address() {
        let mut registry = SiteRegistry::new();
        registry.configure_site("SiteB", "old");
        registry.configure_site("SiteB", "new");

        assert_eq!(registry.resolve("SiteB"), Some("new"));
        assert_eq!(registry.len(), 1);
    }
}
