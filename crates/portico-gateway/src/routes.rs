//! Route table - static path-prefix routing
//!
//! Maps inbound request paths to logical service names. Direct routes
//! forward one rewritten call; composite routes expand into a fixed set
//! of per-service sub-requests for the aggregator. Matching is
//! longest-prefix on whole path segments.

use serde::{Deserialize, Serialize};

use portico_core::{GatewayError, GatewayResult};

use crate::aggregate::SubRequest;

/// A single-service route: requests under `prefix` are forwarded to
/// `service`, with the unmatched remainder appended to `rewrite`.
///
/// `{prefix: "/api/users", service: "users-service", rewrite: "/users"}`
/// forwards `/api/users/42` as `/users/42`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectRoute {
    pub prefix: String,
    pub service: String,
    #[serde(default)]
    pub rewrite: String,
}

/// One downstream call of a composite route. `{id}` in `path` is
/// replaced with the path remainder of the matched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeEntry {
    pub service: String,
    pub path: String,
}

/// A fan-out route: requests under `prefix` expand into one concurrent
/// sub-request per entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeRoute {
    pub prefix: String,
    pub entries: Vec<CompositeEntry>,
}

/// The routing decision for one inbound path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Direct { service: String, path: String },
    Composite { entries: Vec<SubRequest> },
}

/// `true` when `path` falls under `prefix` on a segment boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// The part of `path` after `prefix` ("" on an exact match).
fn remainder<'a>(prefix: &'a str, path: &'a str) -> &'a str {
    if prefix == "/" {
        path
    } else {
        &path[prefix.len()..]
    }
}

/// Static mapping from path prefixes to logical service names.
pub struct RouteTable {
    direct: Vec<DirectRoute>,
    composite: Vec<CompositeRoute>,
}

impl RouteTable {
    /// Build a table. Routes are sorted longest-prefix-first once, so
    /// `route` is a linear scan stopping at the best match.
    pub fn new(mut direct: Vec<DirectRoute>, mut composite: Vec<CompositeRoute>) -> Self {
        direct.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        composite.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { direct, composite }
    }

    /// Configured direct routes, longest prefix first
    pub fn direct_routes(&self) -> &[DirectRoute] {
        &self.direct
    }

    /// Configured composite routes, longest prefix first
    pub fn composite_routes(&self) -> &[CompositeRoute] {
        &self.composite
    }

    /// Route `path`, longest matching prefix winning across both route
    /// kinds. Fails with [`GatewayError::NoRouteMatch`] when nothing
    /// matches.
    pub fn route(&self, path: &str) -> GatewayResult<RouteMatch> {
        let direct = self.direct.iter().find(|r| prefix_matches(&r.prefix, path));
        let composite = self
            .composite
            .iter()
            .find(|r| prefix_matches(&r.prefix, path));

        match (direct, composite) {
            (Some(d), Some(c)) if d.prefix.len() > c.prefix.len() => self.match_direct(d, path),
            (Some(d), None) => self.match_direct(d, path),
            (_, Some(c)) => self.match_composite(c, path),
            (None, None) => Err(GatewayError::NoRouteMatch(path.to_string())),
        }
    }

    fn match_direct(&self, route: &DirectRoute, path: &str) -> GatewayResult<RouteMatch> {
        let rest = remainder(&route.prefix, path);
        let forwarded = format!("{}{}", route.rewrite, rest);
        Ok(RouteMatch::Direct {
            service: route.service.clone(),
            path: if forwarded.is_empty() {
                "/".to_string()
            } else {
                forwarded
            },
        })
    }

    fn match_composite(&self, route: &CompositeRoute, path: &str) -> GatewayResult<RouteMatch> {
        let param = remainder(&route.prefix, path).trim_start_matches('/');

        let entries = route
            .entries
            .iter()
            .map(|entry| {
                if entry.path.contains("{id}") && param.is_empty() {
                    return Err(GatewayError::InvalidRequest(format!(
                        "Composite route {} requires a path parameter",
                        route.prefix
                    )));
                }
                Ok(SubRequest {
                    service: entry.service.clone(),
                    path: entry.path.replace("{id}", param),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(RouteMatch::Composite { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn table() -> RouteTable {
        RouteTable::new(
            vec![
                DirectRoute {
                    prefix: "/api/users".to_string(),
                    service: "users-service".to_string(),
                    rewrite: "/users".to_string(),
                },
                DirectRoute {
                    prefix: "/api/products".to_string(),
                    service: "products-service".to_string(),
                    rewrite: "/products".to_string(),
                },
                DirectRoute {
                    prefix: "/api".to_string(),
                    service: "catalog-service".to_string(),
                    rewrite: String::new(),
                },
            ],
            vec![CompositeRoute {
                prefix: "/api/overview".to_string(),
                entries: vec![
                    CompositeEntry {
                        service: "users-service".to_string(),
                        path: "/users/{id}".to_string(),
                    },
                    CompositeEntry {
                        service: "products-service".to_string(),
                        path: "/products?owner={id}".to_string(),
                    },
                ],
            }],
        )
    }

    #[test]
    fn longest_prefix_wins() {
        let matched = table().route("/api/users/42").unwrap();
        assert_eq!(
            matched,
            RouteMatch::Direct {
                service: "users-service".to_string(),
                path: "/users/42".to_string(),
            }
        );
    }

    #[test]
    fn shorter_prefix_catches_the_rest() {
        let matched = table().route("/api/orders/7").unwrap();
        assert_eq!(
            matched,
            RouteMatch::Direct {
                service: "catalog-service".to_string(),
                path: "/orders/7".to_string(),
            }
        );
    }

    #[test]
    fn prefixes_match_whole_segments_only() {
        // "/api/usersearch" must not match the "/api/users" prefix
        let matched = table().route("/api/usersearch").unwrap();
        assert_eq!(
            matched,
            RouteMatch::Direct {
                service: "catalog-service".to_string(),
                path: "/usersearch".to_string(),
            }
        );
    }

    #[test]
    fn exact_prefix_match_forwards_the_rewrite_base() {
        let matched = table().route("/api/users").unwrap();
        assert_eq!(
            matched,
            RouteMatch::Direct {
                service: "users-service".to_string(),
                path: "/users".to_string(),
            }
        );
    }

    #[test]
    fn composite_route_expands_entries_with_the_path_parameter() {
        let matched = table().route("/api/overview/42").unwrap();
        assert_eq!(
            matched,
            RouteMatch::Composite {
                entries: vec![
                    SubRequest {
                        service: "users-service".to_string(),
                        path: "/users/42".to_string(),
                    },
                    SubRequest {
                        service: "products-service".to_string(),
                        path: "/products?owner=42".to_string(),
                    },
                ],
            }
        );
    }

    #[test]
    fn composite_route_outranks_a_shorter_direct_prefix() {
        // "/api/overview/42" falls under both "/api" and "/api/overview"
        assert!(matches!(
            table().route("/api/overview/42").unwrap(),
            RouteMatch::Composite { .. }
        ));
    }

    #[test]
    fn composite_without_its_parameter_is_rejected() {
        let err = table().route("/api/overview").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn unroutable_path_is_a_no_route_match() {
        let err = table().route("/metrics").unwrap_err();
        assert!(matches!(err, GatewayError::NoRouteMatch(path) if path == "/metrics"));
    }
}
