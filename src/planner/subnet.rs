//! Subnet planning for the Kubernetes service and pod networks.
//!
//! A single operator-supplied /16 is carved into a /17 for pods and a /24 for
//! services, taken from the second half so the two never overlap.

use ipnet::Ipv4Net;

use crate::error::{DeployError, KargoError, Result};

/// Prefix length the input network must have.
pub const REQUIRED_PREFIX_LEN: u8 = 16;

/// Prefix length of the pod network.
pub const PODS_PREFIX_LEN: u8 = 17;

/// Prefix length of the service network.
pub const SERVICE_PREFIX_LEN: u8 = 24;

/// Planned service and pod subnets for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetPlan {
    /// Network for Kubernetes service addresses.
    pub service_network: Ipv4Net,
    /// Network for pod addresses.
    pub pods_network: Ipv4Net,
}

/// Computes the service and pod subnets from a network block.
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressPlanner;

impl AddressPlanner {
    /// Creates a new address planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses the configured kube network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNetwork` if the string is not an IPv4 CIDR.
    pub fn parse_network(network: &str) -> Result<Ipv4Net> {
        network.trim().parse::<Ipv4Net>().map_err(|_| {
            KargoError::Deploy(DeployError::InvalidNetwork {
                network: network.to_string(),
            })
        })
    }

    /// Splits a /16 into the service and pod networks.
    ///
    /// Host bits set in `network` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrefix` unless the prefix length is exactly 16.
    pub fn plan(&self, network: Ipv4Net) -> Result<SubnetPlan> {
        if network.prefix_len() != REQUIRED_PREFIX_LEN {
            return Err(KargoError::Deploy(DeployError::InvalidPrefix {
                network: network.to_string(),
                prefix_len: network.prefix_len(),
            }));
        }

        let network = network.trunc();
        let mut halves = network
            .subnets(PODS_PREFIX_LEN)
            .map_err(|e| KargoError::internal(format!("cannot split {network}: {e}")))?;
        let (Some(pods_network), Some(remainder)) = (halves.next(), halves.next()) else {
            return Err(KargoError::internal(format!("{network} has no /{PODS_PREFIX_LEN} halves")));
        };

        let service_network = remainder
            .subnets(SERVICE_PREFIX_LEN)
            .map_err(|e| KargoError::internal(format!("cannot split {remainder}: {e}")))?
            .next()
            .ok_or_else(|| KargoError::internal(format!("{remainder} has no /{SERVICE_PREFIX_LEN}")))?;

        Ok(SubnetPlan {
            service_network,
            pods_network,
        })
    }
}

impl SubnetPlan {
    /// Usable addresses in the service network.
    #[must_use]
    pub fn service_hosts(&self) -> u64 {
        usable_hosts(&self.service_network)
    }

    /// Usable addresses in the pod network.
    #[must_use]
    pub fn pods_hosts(&self) -> u64 {
        usable_hosts(&self.pods_network)
    }
}

/// Number of usable host addresses, excluding network and broadcast.
#[must_use]
pub fn usable_hosts(network: &Ipv4Net) -> u64 {
    let host_bits = 32 - u32::from(network.prefix_len());
    (1_u64 << host_bits).saturating_sub(2)
}
