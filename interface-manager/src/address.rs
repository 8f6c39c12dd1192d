// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Interface address assignment.

use crate::Manager;
use crate::error::LinkError;
use futures::TryStreamExt;
use ipnet::IpNet;
use net::interface::InterfaceIndex;
use rtnetlink::packet_route::address::{AddressAttribute, AddressMessage};
use tracing::{debug, info};

/// An address assigned to an interface.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct InterfaceAddress {
    /// The interface holding the address.
    pub index: InterfaceIndex,
    /// The address and its prefix length.
    pub net: IpNet,
}

impl InterfaceAddress {
    fn try_from_address_message(message: &AddressMessage) -> Result<Self, LinkError> {
        let index = InterfaceIndex::try_new(message.header.index)
            .map_err(|_| LinkError::Malformed("address bound to link index zero"))?;
        let address = message
            .attributes
            .iter()
            .find_map(|attribute| match attribute {
                AddressAttribute::Address(address) => Some(*address),
                _ => None,
            })
            .ok_or(LinkError::Malformed("address message carries no address"))?;
        let net = IpNet::new(address, message.header.prefix_len)
            .map_err(|_| LinkError::Malformed("illegal prefix length"))?;
        Ok(InterfaceAddress { index, net })
    }
}

impl Manager<InterfaceAddress> {
    /// Assign `net` to the interface `index`.
    ///
    /// Assigning an address the interface already holds is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the kernel rejects the request.
    pub async fn add(&self, index: InterfaceIndex, net: IpNet) -> Result<(), LinkError> {
        match self
            .handle
            .address()
            .add(index.to_u32(), net.addr(), net.prefix_len())
            .execute()
            .await
            .map_err(LinkError::from)
        {
            Ok(()) => {
                info!("assigned {net} to link {index}");
                Ok(())
            }
            Err(LinkError::AlreadyExists) => {
                debug!("link {index} already holds {net}");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// List the addresses held by the interface `index`.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the dump fails or returns a malformed message.
    pub async fn list(&self, index: InterfaceIndex) -> Result<Vec<IpNet>, LinkError> {
        let mut dump = self
            .handle
            .address()
            .get()
            .set_link_index_filter(index.to_u32())
            .execute();
        let mut addresses = vec![];
        while let Some(message) = dump.try_next().await? {
            let address = InterfaceAddress::try_from_address_message(&message)?;
            if address.index == index {
                addresses.push(address.net);
            }
        }
        Ok(addresses)
    }
}
