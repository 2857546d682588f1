use camino::Utf8PathBuf;

use idx_indices_sync::domain::IndexName;
use idx_indices_sync::error::SyncError;
use idx_indices_sync::membership::{
    self, CompanyLists, JsonFileStore, MembershipStore, MembershipTable,
};

fn index(name: &str) -> IndexName {
    name.parse().unwrap()
}

/// Only knows the symbols it was seeded with, like an update-by-key against an existing table.
struct ProfileTable {
    known: Vec<&'static str>,
    writes: Vec<(String, Vec<IndexName>)>,
}

impl MembershipStore for ProfileTable {
    fn update(&mut self, symbol: &str, indices: &[IndexName]) -> Result<usize, SyncError> {
        if !self.known.iter().any(|known| *known == symbol) {
            return Ok(0);
        }
        self.writes.push((symbol.to_string(), indices.to_vec()));
        Ok(1)
    }
}

fn sample_lists() -> CompanyLists {
    let mut lists = CompanyLists::new();
    lists.insert(
        index("IDX30"),
        vec!["BBCA.JK".to_string(), "BBRI.JK".to_string()],
    );
    lists.insert(
        index("LQ45"),
        vec!["BBCA.JK".to_string(), "GOTO.JK".to_string()],
    );
    lists
}

#[test]
fn push_reports_unmatched_symbols() {
    let table = MembershipTable::reconcile(&sample_lists());
    let mut store = ProfileTable {
        known: vec!["BBCA.JK", "BBRI.JK"],
        writes: Vec::new(),
    };

    let summary = membership::push(&table, &mut store).unwrap();
    assert_eq!(summary.symbols, 3);
    assert_eq!(summary.rows_updated, 2);
    assert_eq!(summary.unmatched, vec!["GOTO.JK".to_string()]);
    assert_eq!(
        store.writes[0],
        ("BBCA.JK".to_string(), vec![index("IDX30"), index("LQ45")])
    );
}

#[test]
fn json_store_is_idempotent_and_keyed_by_symbol() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("membership.json")).unwrap();
    let table = MembershipTable::reconcile(&sample_lists());

    let mut store = JsonFileStore::open(path.clone()).unwrap();
    membership::push(&table, &mut store).unwrap();
    let first = std::fs::read_to_string(path.as_std_path()).unwrap();

    let mut store = JsonFileStore::open(path.clone()).unwrap();
    membership::push(&table, &mut store).unwrap();
    let second = std::fs::read_to_string(path.as_std_path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.rows().len(), 3);
    assert_eq!(store.rows()["GOTO.JK"], vec![index("LQ45")]);
}

#[test]
fn empty_table_leaves_store_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("membership.json")).unwrap();
    let table = MembershipTable::reconcile(&CompanyLists::new());
    assert!(table.is_empty());

    let mut store = JsonFileStore::open(path.clone()).unwrap();
    let summary = membership::push(&table, &mut store).unwrap();

    assert_eq!(summary.symbols, 0);
    assert!(!path.as_std_path().exists());
}

#[test]
fn loads_company_lists_from_json() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("lists.json")).unwrap();
    std::fs::write(
        path.as_std_path(),
        r#"{ "IDX BUMN20": ["BBRI.JK"], "SRIKEHATI": ["BBRI.JK", "TLKM.JK"] }"#,
    )
    .unwrap();

    let lists = membership::load_company_lists(&path).unwrap();
    let table = MembershipTable::reconcile(&lists);
    assert_eq!(
        table.get("BBRI.JK").unwrap(),
        &[index("IDX BUMN20"), index("SRIKEHATI")]
    );
}
