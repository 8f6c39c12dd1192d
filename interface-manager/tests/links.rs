// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use vxlan_cni_interface_manager as interface_manager;

use caps::Capability;
use fixin::wrap;
use interface_manager::address::InterfaceAddress;
use interface_manager::error::LinkError;
use interface_manager::interface::{
    BridgePropertiesSpec, InterfacePropertiesSpec, InterfaceSpec, InterfaceSpecBuilder,
    VethPropertiesSpec,
};
use interface_manager::netns::Netns;
use interface_manager::{Manager, manager_of};
use ipnet::IpNet;
use net::interface::{Interface, InterfaceName, LinkKind};
use test_utils::{in_scoped_netns, netns_path, with_caps, with_netns};
use tracing_test::traced_test;

fn name(name: &str) -> InterfaceName {
    InterfaceName::try_from(name).unwrap()
}

fn bridge(name: &str) -> InterfaceSpec {
    InterfaceSpecBuilder::default()
        .name(self::name(name))
        .mtu(Some(1500))
        .properties(InterfacePropertiesSpec::Bridge(BridgePropertiesSpec::default()))
        .build()
        .unwrap()
}

#[tokio::test]
#[wrap(with_caps([Capability::CAP_NET_ADMIN]))]
#[wrap(in_scoped_netns("im_bridge_lifecycle"))]
#[traced_test]
async fn bridge_lifecycle() {
    let links: Manager<Interface> = Manager::connect().unwrap();
    let spec = bridge("br-test");

    assert!(links.get_by_name(&spec.name).await.unwrap().is_none());
    links.create(&spec).await.unwrap();
    assert!(matches!(
        links.create(&spec).await,
        Err(LinkError::AlreadyExists)
    ));

    let observed = links.get_by_name(&spec.name).await.unwrap().unwrap();
    assert!(spec.properties == observed.properties);
    assert_eq!(observed.kind(), LinkKind::Bridge);
    assert_eq!(observed.mtu, Some(1500));
    assert!(!observed.is_up());

    links.set_up(observed.index).await.unwrap();
    let by_index = links.get_by_index(observed.index).await.unwrap().unwrap();
    assert!(by_index.is_up());
    assert_eq!(by_index.name, spec.name);

    let net: IpNet = "10.9.0.1/24".parse().unwrap();
    let addresses = manager_of::<InterfaceAddress>(&links);
    addresses.add(observed.index, net).await.unwrap();
    addresses.add(observed.index, net).await.unwrap();
    let held = addresses.list(observed.index).await.unwrap();
    assert_eq!(held.iter().filter(|held| **held == net).count(), 1);

    links.remove(observed.index).await.unwrap();
    assert!(links.get_by_name(&spec.name).await.unwrap().is_none());
    assert!(matches!(
        links.remove(observed.index).await,
        Err(LinkError::NotFound)
    ));
}

#[tokio::test]
#[wrap(with_caps([Capability::CAP_NET_ADMIN, Capability::CAP_SYS_ADMIN]))]
#[wrap(with_netns("im_veth_peer"))]
#[wrap(in_scoped_netns("im_veth_host"))]
#[traced_test]
async fn veth_end_moves_between_namespaces() {
    let host_links: Manager<Interface> = Manager::connect().unwrap();
    let host_ns = Netns::current().unwrap();
    let other_ns = Netns::open(netns_path("im_veth_peer")).unwrap();
    let bridge_spec = bridge("br-veth");
    host_links.create(&bridge_spec).await.unwrap();
    let bridge = host_links
        .get_by_name(&bridge_spec.name)
        .await
        .unwrap()
        .unwrap();

    let scope = other_ns.enter().unwrap();
    let other_links: Manager<Interface> = Manager::connect().unwrap();
    let spec = InterfaceSpec {
        name: name("inner0"),
        mtu: None,
        properties: InterfacePropertiesSpec::Veth(VethPropertiesSpec {
            peer: name("outer0"),
        }),
    };
    other_links.create(&spec).await.unwrap();
    let outer = other_links
        .get_by_name(&name("outer0"))
        .await
        .unwrap()
        .unwrap();
    other_links
        .move_to_netns(outer.index, &host_ns)
        .await
        .unwrap();
    assert!(
        other_links
            .get_by_name(&name("outer0"))
            .await
            .unwrap()
            .is_none()
    );
    let inner = other_links
        .get_by_name(&name("inner0"))
        .await
        .unwrap()
        .unwrap();
    assert!(inner.is_veth());
    scope.exit().unwrap();

    let outer = host_links
        .get_by_name(&name("outer0"))
        .await
        .unwrap()
        .unwrap();
    assert!(outer.is_veth());
    host_links
        .set_controller(outer.index, bridge.index)
        .await
        .unwrap();
    let outer = host_links
        .get_by_index(outer.index)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outer.controller, Some(bridge.index));
}
