use crate::core::connections::{ConnectionRegistry, Connector, RegistryConfig, SelfLoopPolicy};
use crate::core::nodes::{Node, NodeIo};
use crate::core::values::TypeTag;
use std::sync::Arc;
use std::thread;

// Simple test node with typed pins and no behaviour
fn test_node(inputs: &[TypeTag], outputs: &[TypeTag]) -> Node {
    Node::new("test", inputs, outputs, |_io: &mut NodeIo<'_>| Ok::<(), String>(()))
}

fn int_source() -> Node {
    test_node(&[], &[TypeTag::of::<i32>()])
}

fn int_sink() -> Node {
    test_node(&[TypeTag::of::<i32>()], &[])
}

#[test]
fn test_is_connectable_truth_table() {
    let registry = ConnectionRegistry::default();
    let source = test_node(&[TypeTag::of::<i32>()], &[TypeTag::of::<i32>(), TypeTag::of::<bool>()]);
    let sink = test_node(&[TypeTag::of::<i32>(), TypeTag::of::<bool>()], &[TypeTag::of::<i32>()]);

    let int_in = sink.input(0).unwrap();
    let bool_in = sink.input(1).unwrap();
    let int_out = source.output(0).unwrap();
    let bool_out = source.output(1).unwrap();

    assert!(registry.is_connectable(&int_in, &int_out));
    assert!(registry.is_connectable(&bool_in, &bool_out));
    // Type mismatch
    assert!(!registry.is_connectable(&int_in, &bool_out));
    // Wrong directions
    assert!(!registry.is_connectable(&int_out, &int_in));
    assert!(!registry.is_connectable(&int_in, &source.input(0).unwrap()));
    assert!(!registry.is_connectable(&sink.output(0).unwrap(), &int_out));

    // Occupied input
    registry.try_connect(&int_in, &int_out, false).unwrap();
    assert!(!registry.is_connectable(&int_in, &int_out));
    assert!(registry.is_connectable(&bool_in, &bool_out));
}

#[test]
fn test_second_connect_into_same_input_fails() {
    let registry = ConnectionRegistry::default();
    let a = int_source();
    let b = int_source();
    let sink = int_sink();
    let input = sink.input(0).unwrap();

    let first = registry.try_connect(&input, &a.output(0).unwrap(), false);
    let second = registry.try_connect(&input, &b.output(0).unwrap(), false);

    let first = first.expect("first connect should succeed");
    assert!(second.is_none(), "second driver must be refused, not swapped in");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.connector_into(&input).unwrap().id(), first.id());
    assert!(registry.check_connection(&input, &b.output(0).unwrap()).unwrap_err().contains("already driven"));
}

#[test]
fn test_output_fans_out() {
    let registry = ConnectionRegistry::default();
    let source = int_source();
    let output = source.output(0).unwrap();
    let sinks: Vec<Node> = (0..3).map(|_| int_sink()).collect();

    for sink in &sinks {
        assert!(registry.try_connect(&sink.input(0).unwrap(), &output, false).is_some());
    }
    assert_eq!(registry.connectors_from(&output).len(), 3);
    assert!(registry.has_connection(&output));

    let stats = registry.stats();
    assert_eq!(stats.connectors, 3);
    assert_eq!(stats.driven_inputs, 3);
    assert_eq!(stats.driving_outputs, 1);
}

#[test]
fn test_remove_unregistered_is_noop() {
    let registry = ConnectionRegistry::default();
    let source = int_source();
    let sink = int_sink();
    let other = int_sink();

    let registered = registry
        .try_connect(&sink.input(0).unwrap(), &source.output(0).unwrap(), false)
        .unwrap();
    let stray = Connector::new(source.output(0).unwrap(), other.input(0).unwrap()).unwrap();

    assert!(!registry.try_remove(&stray));
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&registered));
    assert!(!registry.has_connection(&other.input(0).unwrap()));
}

#[test]
fn test_skip_registration_builds_without_committing() {
    let registry = ConnectionRegistry::default();
    let source = int_source();
    let sink = int_sink();
    let input = sink.input(0).unwrap();

    let connector = registry.try_connect(&input, &source.output(0).unwrap(), true).unwrap();
    assert!(registry.is_empty());
    assert!(!registry.has_connection(&input));

    registry.register_existing(connector.clone());
    assert!(registry.contains(&connector));
    assert!(registry.has_connection(&input));
}

#[test]
fn test_remove_and_reregister_keeps_identity() {
    let registry = ConnectionRegistry::default();
    let source = int_source();
    let sink = int_sink();
    let input = sink.input(0).unwrap();
    let connector = registry.try_connect(&input, &source.output(0).unwrap(), false).unwrap();

    // undo
    assert!(registry.try_remove(&connector));
    assert!(!registry.has_connection(&input));
    assert!(!registry.try_remove(&connector));

    // redo
    registry.register_existing(connector.clone());
    registry.register_existing(connector.clone());
    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(&registry.connector_into(&input).unwrap(), &connector));
}

#[test]
fn test_sever_node_removes_all_incident_connectors() {
    let registry = ConnectionRegistry::default();
    let upstream = int_source();
    let middle = test_node(&[TypeTag::of::<i32>()], &[TypeTag::of::<i32>()]);
    let downstream: Vec<Node> = (0..2).map(|_| int_sink()).collect();
    let bystander = int_sink();

    registry.try_connect(&middle.input(0).unwrap(), &upstream.output(0).unwrap(), false).unwrap();
    for sink in &downstream {
        registry.try_connect(&sink.input(0).unwrap(), &middle.output(0).unwrap(), false).unwrap();
    }
    registry.try_connect(&bystander.input(0).unwrap(), &upstream.output(0).unwrap(), false).unwrap();

    let severed = registry.sever_node(&middle);
    assert_eq!(severed.len(), 3);
    assert_eq!(registry.len(), 1);
    for connector in registry.connectors() {
        assert!(!middle.inputs().iter().chain(middle.outputs()).any(|pin| connector.touches(pin)));
    }
    for sink in &downstream {
        assert!(!registry.has_connection(&sink.input(0).unwrap()));
    }
}

#[test]
fn test_self_loop_policy() {
    let node = test_node(&[TypeTag::of::<bool>()], &[TypeTag::of::<bool>()]);
    let input = node.input(0).unwrap();
    let output = node.output(0).unwrap();

    let permissive = ConnectionRegistry::new(RegistryConfig::new());
    let connector = permissive.try_connect(&input, &output, false).unwrap();
    assert!(connector.is_self_connecting());

    let strict = ConnectionRegistry::new(RegistryConfig::new().with_self_loop_policy(SelfLoopPolicy::Forbid));
    assert!(!strict.is_connectable(&input, &output));
    assert!(strict.try_connect(&input, &output, false).is_none());
}

#[test]
fn test_propagate_copies_output_values() {
    let registry = ConnectionRegistry::default();
    let source = int_source();
    let sink = int_sink();
    registry.try_connect(&sink.input(0).unwrap(), &source.output(0).unwrap(), false).unwrap();

    source.output(0).unwrap().set(7i32).unwrap();
    assert_eq!(registry.propagate(), 1);
    assert_eq!(sink.input(0).unwrap().get::<i32>().unwrap(), 7);
    assert_eq!(registry.propagate(), 0);
}

#[test]
fn test_concurrent_connects_admit_one_driver() {
    let registry = Arc::new(ConnectionRegistry::default());
    let sink = int_sink();
    let input = sink.input(0).unwrap();
    let sources: Vec<Node> = (0..8).map(|_| int_source()).collect();

    let winners: usize = thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let registry = registry.clone();
                let input = input.clone();
                let output = source.output(0).unwrap();
                scope.spawn(move || registry.try_connect(&input, &output, false).is_some())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
    });

    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_second_registered_driver_keeps_input_index_honest() {
    let registry = ConnectionRegistry::default();
    let a = int_source();
    let b = int_source();
    let sink = int_sink();
    let input = sink.input(0).unwrap();

    let first = registry.try_connect(&input, &a.output(0).unwrap(), false).unwrap();
    let second = Arc::new(Connector::new(b.output(0).unwrap(), input.clone()).unwrap());
    registry.register_existing(second.clone());
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.connector_into(&input).unwrap().id(), first.id());

    // Dropping the later driver leaves the earlier one indexed
    assert!(registry.try_remove(&second));
    assert!(registry.has_connection(&input));
    assert!(!registry.is_connectable(&input, &b.output(0).unwrap()));

    // Dropping the indexed driver hands the input to the remaining one
    registry.register_existing(second.clone());
    assert!(registry.try_remove(&first));
    assert_eq!(registry.connector_into(&input).unwrap().id(), second.id());

    assert!(registry.try_remove(&second));
    assert!(!registry.has_connection(&input));
    assert!(registry.is_connectable(&input, &a.output(0).unwrap()));
}
