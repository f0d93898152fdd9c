//! Utilities shared by the integration tests.

use std::sync::{Arc, Once};

use kas_common::logging::{self, LoggerConfig};
use kas_multisig::tracker::MultisigTracker;
use kas_signer::wallet::KasWallet;
use kas_test_utils::FakeKas;
use tracing::{event, Level};

static LOGGING: Once = Once::new();

/// Everything a test needs: the fake service and the components wired to it.
pub(crate) struct TestEnv {
    pub(crate) fake: Arc<FakeKas>,
    pub(crate) wallet: KasWallet<FakeKas, FakeKas>,
    pub(crate) tracker: MultisigTracker<FakeKas>,
}

pub(crate) fn setup() -> TestEnv {
    LOGGING.call_once(|| {
        logging::try_init(LoggerConfig::with_base_name("(kas-integration-tests)"));
    });

    event!(Level::INFO, action = "starting fake custodial service");

    let fake = Arc::new(FakeKas::new());
    let wallet = KasWallet::new(fake.clone(), fake.clone());
    let tracker = MultisigTracker::new(fake.clone());

    TestEnv {
        fake,
        wallet,
        tracker,
    }
}
