//! Property-based tests for podnotify
//!
//! These tests verify invariants that must hold for all inputs:
//! - Inbox refreshes announce each entry once, in ascending order
//! - The registry keeps only the latest subscriber
//! - ACL edits leave other agents untouched
//!
//! Run with: cargo test --test property_tests

use std::sync::Arc;

use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// ============================================================================
// INBOX POLLER
// ============================================================================

mod poller_tests {
    use super::*;
    use podnotify::client::InboxPoller;
    use podnotify::MemoryPod;

    const INBOX: &str = "https://client.example/inbox/";

    fn entry(name: &str) -> String {
        format!("{}{}", INBOX, name)
    }

    proptest! {
        /// Invariant: a refresh announces unseen entries sorted, and a second
        /// refresh over the same listing announces nothing
        #[test]
        fn refresh_is_sorted_and_idempotent(names in prop::collection::vec("[a-z0-9]{1,12}", 0..20)) {
            let pod = MemoryPod::new("https://client.example/profile#me");
            pod.add_container(INBOX);
            for name in &names {
                pod.add_resource(INBOX, &entry(name));
            }
            let poller = InboxPoller::new(Arc::new(pod), INBOX);

            let (first, second) = block_on(async {
                let first = poller.refresh().await.unwrap();
                let second = poller.refresh().await.unwrap();
                (first, second)
            });

            let mut expected: Vec<String> = names.iter().map(|n| entry(n)).collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(&first, &expected);
            prop_assert!(second.is_empty());
            prop_assert_eq!(poller.seen_count(), expected.len());
        }

        /// Invariant: entries are announced at most once over any sequence of
        /// additions and removals
        #[test]
        fn removed_entries_are_never_announced_twice(
            steps in prop::collection::vec(("[a-e]", any::<bool>()), 1..30)
        ) {
            let pod = MemoryPod::new("https://client.example/profile#me");
            pod.add_container(INBOX);
            let poller = InboxPoller::new(Arc::new(pod.clone()), INBOX);

            let announced = block_on(async {
                let mut announced = Vec::new();
                for (name, add) in &steps {
                    if *add {
                        pod.add_resource(INBOX, &entry(name));
                    } else {
                        pod.remove_resource(INBOX, &entry(name));
                    }
                    announced.extend(poller.refresh().await.unwrap());
                }
                announced
            });

            let mut unique = announced.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), announced.len());
        }
    }
}

// ============================================================================
// SUBSCRIPTION REGISTRY
// ============================================================================

mod registry_tests {
    use super::*;
    use podnotify::server::SubscriptionRegistry;

    proptest! {
        /// Invariant: after any sequence of registrations the latest
        /// non-blank inbox is the subscriber
        #[test]
        fn last_registration_wins(inboxes in prop::collection::vec(prop::option::of("[ ]{0,2}|https://[a-z]{1,8}\\.example/inbox/"), 1..10)) {
            let registry = SubscriptionRegistry::new("https://server.example/profile#me");
            let mut expected: Option<String> = None;

            for inbox in &inboxes {
                let result = registry.register(inbox.as_deref());
                match inbox.as_deref().map(str::trim) {
                    Some(url) if !url.is_empty() => {
                        prop_assert!(result.is_ok());
                        expected = Some(url.to_string());
                    }
                    _ => prop_assert!(result.is_err()),
                }
                prop_assert_eq!(registry.current(), expected.clone());
            }
        }
    }
}

// ============================================================================
// ACL DOCUMENTS
// ============================================================================

mod acl_tests {
    use super::*;
    use podnotify::pod::{AclDocument, AclRelation};
    use podnotify::AccessModes;

    const OWNER: &str = "https://client.example/profile#me";
    const INBOX: &str = "https://client.example/inbox/";

    fn modes() -> impl Strategy<Value = AccessModes> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(read, append, write, control)| AccessModes {
                read,
                append,
                write,
                control,
            },
        )
    }

    proptest! {
        /// Invariant: granting one agent never changes the owner's access
        #[test]
        fn grant_leaves_owner_untouched(agent in "https://[a-z]{1,8}\\.example/profile#me", m in modes(), inherit in any::<bool>()) {
            prop_assume!(agent != OWNER);
            let mut acl = AclDocument::for_owner(format!("{}.acl", INBOX), INBOX, OWNER);
            acl.set_agent_access(&agent, m, AclRelation::Resource);
            if inherit {
                acl.set_agent_access(&agent, m, AclRelation::Default);
            }

            prop_assert_eq!(acl.agent_access(OWNER, AclRelation::Resource), AccessModes::FULL);
            prop_assert_eq!(acl.agent_access(OWNER, AclRelation::Default), AccessModes::FULL);
            prop_assert_eq!(acl.agent_access(&agent, AclRelation::Resource), m);
        }

        /// Invariant: Turtle output never panics and names every grant
        #[test]
        fn turtle_lists_granted_agents(agent in "https://[a-z]{1,8}\\.example/profile#me") {
            prop_assume!(agent != OWNER);
            let mut acl = AclDocument::for_owner(format!("{}.acl", INBOX), INBOX, OWNER);
            acl.set_agent_access(&agent, AccessModes::READ_APPEND, AclRelation::Resource);
            let turtle = acl.to_turtle().unwrap();
            let agent_ref = format!("<{}>", agent);
            let owner_ref = format!("<{}>", OWNER);
            prop_assert!(turtle.contains(&agent_ref));
            prop_assert!(turtle.contains(&owner_ref));
        }
    }
}
