//! Route resolution
//!
//! Maps a logical method name plus its params to a concrete API path and
//! the params that end up in the request body. Some routes embed an
//! identifier taken from the params (`contact_info/{contact_id}`), and
//! those routes only exist for a call whose params carry that identifier.
//!
//! Dynamic routes come from [`ROUTE_RULES`], evaluated in order over a
//! working copy of the params. A rule may consume a key from the working
//! copy, which hides it from every later rule and from fixed routes. The
//! contact rule empties the body of fixed routes and of routes registered
//! before it. When two rules register the same path the later one wins.

use tracing::debug;

use crate::error::{LbcError, LbcResult};
use crate::params::Params;

pub const MESSAGE_KEY: &str = "msg";
pub const CONTACT_ID_KEY: &str = "contact_id";
pub const AD_ID_KEY: &str = "ad_id";
pub const PIN_KEY: &str = "pincode";

/// Methods callable without authentication
pub const PUBLIC_METHODS: &[&str] = &["countrycodes", "currencies", "payment_methods", "places"];

/// Private methods whose path does not depend on params
pub const PRIVATE_METHODS: &[&str] = &[
    "ads",
    "ad-get",
    "ad-create",
    "myself",
    "dashboard",
    "dashboard/released",
    "dashboard/canceled",
    "dashboard/closed",
    "dashboard/released/buyer",
    "dashboard/canceled/buyer",
    "dashboard/closed/buyer",
    "dashboard/released/seller",
    "dashboard/canceled/seller",
    "dashboard/closed/seller",
    "wallet-send",
    "notifications",
    "recent_messages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

/// What a rule does to the body sent with the routes it registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTransform {
    /// Send the working params as they are
    Keep,
    /// Send the working params minus the identifier used in the path
    StripId,
    /// Send no body at all
    Clear,
}

/// One dynamic routing rule
#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub name: &'static str,
    /// Rule fires when this key is present in the working params
    pub trigger: &'static str,
    /// Key whose value is appended to every path prefix
    pub id_key: &'static str,
    pub prefixes: &'static [&'static str],
    pub body: BodyTransform,
    /// Remove `id_key` from the working params after this rule
    pub consumes_id: bool,
    /// Empty the body of fixed routes and of routes registered by earlier
    /// rules. Later rules still see the working params.
    pub clears_params: bool,
}

/// Rule order is significant
pub const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        name: "message",
        trigger: MESSAGE_KEY,
        id_key: CONTACT_ID_KEY,
        prefixes: &["contact_message_post"],
        body: BodyTransform::StripId,
        consumes_id: true,
        clears_params: false,
    },
    RouteRule {
        name: "ad",
        trigger: AD_ID_KEY,
        id_key: AD_ID_KEY,
        prefixes: &["ad-delete", "ad-get", "ad-equation"],
        body: BodyTransform::Keep,
        consumes_id: false,
        clears_params: false,
    },
    RouteRule {
        name: "contact",
        trigger: CONTACT_ID_KEY,
        id_key: CONTACT_ID_KEY,
        prefixes: &[
            "contact_info",
            "contact_messages",
            "contact_cancel",
            "contact_release",
        ],
        body: BodyTransform::Clear,
        consumes_id: false,
        clears_params: true,
    },
    RouteRule {
        name: "pin",
        trigger: PIN_KEY,
        id_key: CONTACT_ID_KEY,
        prefixes: &["contact_release_pin"],
        body: BodyTransform::StripId,
        consumes_id: true,
        clears_params: false,
    },
];

impl RouteRule {
    /// Apply this rule to the working params, returning the routes it registers
    fn apply(&self, working: &mut Params) -> Vec<(String, Params)> {
        if !working.contains_key(self.trigger) {
            return Vec::new();
        }

        let id = working.get(self.id_key).unwrap_or_default().to_string();
        let body = match self.body {
            BodyTransform::Keep => working.clone(),
            BodyTransform::StripId => working.without(self.id_key),
            BodyTransform::Clear => Params::new(),
        };

        if self.consumes_id {
            working.remove(self.id_key);
        }

        self.prefixes
            .iter()
            .map(|prefix| (format!("{}/{}", prefix, id), body.clone()))
            .collect()
    }
}

/// Routes available for one call
#[derive(Debug, Clone)]
pub struct RouteTable {
    dynamic: Vec<(String, Params)>,
    fixed_params: Params,
}

impl RouteTable {
    /// Build the table for a call with `params`
    pub fn build(params: &Params) -> Self {
        Self::build_with_rules(params, ROUTE_RULES)
    }

    pub fn build_with_rules(params: &Params, rules: &[RouteRule]) -> Self {
        let mut working = params.clone();
        let mut dynamic: Vec<(String, Params)> = Vec::new();
        let mut cleared = false;

        for rule in rules {
            let routes = rule.apply(&mut working);
            if rule.clears_params && !routes.is_empty() {
                debug!(rule = rule.name, "Clearing params for earlier routes");
                cleared = true;
                for (_, body) in dynamic.iter_mut() {
                    body.clear();
                }
            }

            for (path, body) in routes {
                debug!(rule = rule.name, path = %path, "Registered dynamic route");
                match dynamic.iter_mut().find(|(p, _)| *p == path) {
                    Some(existing) => existing.1 = body,
                    None => dynamic.push((path, body)),
                }
            }
        }

        if cleared {
            working.clear();
        }

        Self {
            dynamic,
            fixed_params: working,
        }
    }

    /// Private paths derived from the params of this call
    pub fn dynamic_paths(&self) -> impl Iterator<Item = &str> {
        self.dynamic.iter().map(|(p, _)| p.as_str())
    }

    pub fn lookup(&self, method: &str) -> Option<ResolvedRoute> {
        if PUBLIC_METHODS.iter().any(|m| *m == method) {
            return Some(ResolvedRoute {
                path: method.to_string(),
                access: Access::Public,
                params: self.fixed_params.clone(),
            });
        }

        if PRIVATE_METHODS.iter().any(|m| *m == method) {
            return Some(ResolvedRoute {
                path: method.to_string(),
                access: Access::Private,
                params: self.fixed_params.clone(),
            });
        }

        self.dynamic
            .iter()
            .find(|(path, _)| path == method)
            .map(|(path, body)| ResolvedRoute {
                path: path.clone(),
                access: Access::Private,
                params: body.clone(),
            })
    }
}

/// A method resolved to a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Path relative to the API root, without surrounding slashes
    pub path: String,
    pub access: Access,
    /// Params to sign and send
    pub params: Params,
}

/// Resolve `method` for a call carrying `params`
pub fn resolve(method: &str, params: &Params) -> LbcResult<ResolvedRoute> {
    RouteTable::build(params)
        .lookup(method)
        .ok_or_else(|| LbcError::MethodNotFound(method.to_string()))
}
