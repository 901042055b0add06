//! Behavioural tests reconciling parsed aggregates into `SqliteAggregateStore`.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use pcidb_core::{
    AggregateStore, HashMode, Outcome, Root, Section, SqliteAggregateStore, ValidationPolicy,
    build_section, lines::split_sections, reconcile,
};

const ONE_VENDOR: &str = "0001  VendorA\n\t0001  DeviceA\n\t\t0002 0003  SubdeviceA\n";
const RENAMED_SUBDEVICE: &str = "0001  VendorA\n\t0001  DeviceA\n\t\t0002 0003  SubdeviceB\n";
const ONE_CLASS: &str = "C 01  Mass storage controller\n";

struct ReconcileWorld {
    store: RefCell<Option<SqliteAggregateStore>>,
    outcomes: RefCell<Vec<Outcome>>,
}

impl ReconcileWorld {
    fn new() -> Self {
        Self {
            store: RefCell::new(None),
            outcomes: RefCell::new(Vec::new()),
        }
    }

    fn reconcile_text(&self, text: &str) -> Vec<Outcome> {
        let sections = split_sections(text);
        let mut holder = self.store.borrow_mut();
        let store = holder.as_mut().expect("store should be opened first");
        let mut outcomes = Vec::new();
        for (section, lines) in [
            (Section::Classes, sections.classes),
            (Section::Devices, sections.devices),
        ] {
            for root in build_section(section, lines, ValidationPolicy::Strict) {
                let root = root.expect("well-formed registry").seal(HashMode::Compatible);
                outcomes.push(reconcile(store, section, &root).expect("reconcile root"));
            }
        }
        outcomes
    }

    fn stored(&self, section: Section, id: &str) -> Root {
        self.store
            .borrow()
            .as_ref()
            .expect("store should be opened first")
            .find_root(section, id)
            .expect("read aggregate")
            .expect("aggregate should be stored")
    }

    fn record(&self, text: &str) {
        let outcomes = self.reconcile_text(text);
        self.outcomes.replace(outcomes);
    }

    fn assert_outcomes(&self, expected: &[Outcome]) {
        assert_eq!(self.outcomes.borrow().as_slice(), expected);
    }
}

#[fixture]
fn world() -> ReconcileWorld {
    ReconcileWorld::new()
}

#[given("an empty SQLite aggregate store")]
fn given_store(world: &ReconcileWorld) {
    let store = SqliteAggregateStore::open_in_memory().expect("open in-memory store");
    world.store.replace(Some(store));
}

#[given("a registry with one vendor was already reconciled")]
fn given_reconciled(world: &ReconcileWorld) {
    world.reconcile_text(ONE_VENDOR);
}

#[when("I reconcile a registry with one vendor")]
fn reconcile_one_vendor(world: &ReconcileWorld) {
    world.record(ONE_VENDOR);
}

#[when("I reconcile a registry whose subdevice was renamed")]
fn reconcile_renamed(world: &ReconcileWorld) {
    world.record(RENAMED_SUBDEVICE);
}

#[when("I reconcile a registry with one class")]
fn reconcile_class(world: &ReconcileWorld) {
    world.record(ONE_CLASS);
}

#[then("the vendor is inserted")]
fn then_inserted(world: &ReconcileWorld) {
    world.assert_outcomes(&[Outcome::Inserted]);
}

#[then("the class is inserted")]
fn then_class_inserted(world: &ReconcileWorld) {
    world.assert_outcomes(&[Outcome::Inserted]);
    assert_eq!(world.stored(Section::Classes, "01").name, "Mass storage controller");
    assert_eq!(world.stored(Section::Devices, "0001").name, "VendorA");
}

#[then("the vendor is skipped")]
fn then_skipped(world: &ReconcileWorld) {
    world.assert_outcomes(&[Outcome::Skipped]);
}

#[then("the vendor is replaced")]
fn then_replaced(world: &ReconcileWorld) {
    world.assert_outcomes(&[Outcome::Replaced]);
}

#[then("the stored vendor carries its content hash")]
fn then_hash(world: &ReconcileWorld) {
    assert_eq!(
        world.stored(Section::Devices, "0001").hash,
        "o52HT012ujqqDt4ldNehyC/16e4="
    );
}

#[then("the stored subdevice carries the new name")]
fn then_new_name(world: &ReconcileWorld) {
    let vendor = world.stored(Section::Devices, "0001");
    let device = vendor.child("0001").expect("device should be stored");
    assert_eq!(device.descendants[0].name, "SubdeviceB");
}

#[scenario(path = "tests/features/reconcile_sqlite.feature", index = 0)]
fn vendor_inserted(world: ReconcileWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/reconcile_sqlite.feature", index = 1)]
fn vendor_skipped(world: ReconcileWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/reconcile_sqlite.feature", index = 2)]
fn vendor_replaced(world: ReconcileWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/reconcile_sqlite.feature", index = 3)]
fn sections_are_separate(world: ReconcileWorld) {
    let _ = world;
}
