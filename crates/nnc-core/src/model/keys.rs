// ── Resource keys ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one router interface: rendered as `router:interface`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceKey {
    pub router_id: String,
    pub interface_id: String,
}

impl InterfaceKey {
    pub fn new(router_id: impl Into<String>, interface_id: impl Into<String>) -> Self {
        Self {
            router_id: router_id.into(),
            interface_id: interface_id.into(),
        }
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.router_id, self.interface_id)
    }
}

/// Identifies one service instance running on a router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    pub router_id: String,
    pub instance_id: String,
}

impl ServiceKey {
    pub fn new(router_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            router_id: router_id.into(),
            instance_id: instance_id.into(),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.router_id, self.instance_id)
    }
}

/// Identifies one monitored WAN link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub router_id: String,
    pub wan_id: String,
}

impl LinkKey {
    pub fn new(router_id: impl Into<String>, wan_id: impl Into<String>) -> Self {
        Self {
            router_id: router_id.into(),
            wan_id: wan_id.into(),
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.router_id, self.wan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_router_first() {
        assert_eq!(InterfaceKey::new("r1", "ether1").to_string(), "r1:ether1");
        assert_eq!(ServiceKey::new("r1", "tor-1").to_string(), "r1:tor-1");
        assert_eq!(LinkKey::new("r1", "wan1").to_string(), "r1:wan1");
    }
}
