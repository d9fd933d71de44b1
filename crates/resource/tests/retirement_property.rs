//! Property test: every connection ever produced is closed exactly once,
//! whatever the sequence of fingerprint changes and provider failures.

use std::sync::Arc;

use proptest::prelude::*;
use relink_resource::{ContainerBuilder, Provider};
use relink_resource::testing::ScriptedProvider;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
enum Step {
    /// Pass with the fingerprint unchanged.
    Same,
    /// New fingerprint, provider succeeds.
    Change,
    /// New fingerprint, provider fails.
    FailedChange,
    /// New fingerprint, and the new connection will refuse to close.
    ChangeWithCloseFailure,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Same),
        Just(Step::Change),
        Just(Step::FailedChange),
        Just(Step::ChangeWithCloseFailure),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
}

proptest! {
    #[test]
    fn every_connection_closed_exactly_once(steps in prop::collection::vec(arb_step(), 1..40)) {
        let (produced, closes, successes) = runtime().block_on(async move {
            let provider = Arc::new(ScriptedProvider::new("gen-0"));
            let container = ContainerBuilder::new()
                .provider("db", Arc::clone(&provider))
                .build_container();
            let cancel = CancellationToken::new();
            container.run(&cancel).await.expect("first pass succeeds");

            let mut applied = "gen-0".to_string();
            let mut successes = 1usize;
            for (i, step) in steps.iter().enumerate() {
                let next = format!("gen-{}", i + 1);
                match step {
                    Step::Same => {}
                    Step::Change => provider.set_fingerprint(next),
                    Step::FailedChange => {
                        provider.set_fingerprint(next);
                        provider.fail_next(1);
                    }
                    Step::ChangeWithCloseFailure => {
                        provider.fail_close(true);
                        provider.set_fingerprint(next);
                    }
                }
                let wanted = provider.fingerprint();
                if container.run(&cancel).await.is_ok() && wanted != applied {
                    successes += 1;
                    applied = wanted;
                }
                provider.fail_close(false);
            }

            container.stop().await;
            let ledger = provider.ledger();
            let closes: Vec<u32> = ledger.connections().iter().map(|c| c.close_count()).collect();
            (ledger.connections().len(), closes, successes)
        });

        prop_assert_eq!(produced, successes);
        for (id, count) in closes.iter().enumerate() {
            prop_assert_eq!(*count, 1, "connection {} closed {} times", id, count);
        }
    }
}
