use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::extract::SqliteWarehouse;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Report run date used with the fixture: the report window is September 2026.
pub fn fixture_today() -> NaiveDate {
    date(2026, 10, 18)
}

pub fn fixture_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory sqlite");
    connection
        .execute_batch(FIXTURE_SQL)
        .expect("fixture schema and rows");
    connection
}

/// Write the fixture tables to a snapshot file on disk.
pub fn write_fixture_snapshot(path: &Path) {
    let connection = Connection::open(path).expect("snapshot sqlite");
    connection
        .execute_batch(FIXTURE_SQL)
        .expect("fixture schema and rows");
}

pub fn fixture_warehouse() -> SqliteWarehouse {
    SqliteWarehouse::from_connection(fixture_connection())
}

const FIXTURE_SQL: &str = "
CREATE TABLE KNOWLEDGE_ARTICLE_VERSIONS_SOURCE_T (
  ARTICLE_NUMBER TEXT,
  ARTILE_TITLE TEXT,
  PUBLISHED_BY_NAME TEXT,
  PUBLISHED_BY_REGION TEXT,
  PUBLIC_KB_VIEWCOUNT INTEGER,
  ARTICLE_FIRST_PUBLISHED_DATE TEXT,
  DAYS_TO_PUBLISH REAL,
  ARTICLE_TYPE TEXT,
  PUBLISH_STATUS TEXT,
  INTERNAL INTEGER,
  COMMUNITY_ARTICLE_URL TEXT,
  ARTICLE_CASE_ATTACH_COUNT INTEGER,
  CREATOR_REGION TEXT,
  ARTICLE_CREATED_DATE TEXT,
  CREATOR_NAME TEXT,
  VISIBLE_IN_CUSTOMER_PORTAL TEXT,
  VERSION_IS_LATEST TEXT
);

INSERT INTO KNOWLEDGE_ARTICLE_VERSIONS_SOURCE_T VALUES
  ('KA-1', 'Reset MFA', 'Ana', 'AMERICAS', NULL, '2026-09-03 10:00:00', 4, 'FAQ', 'Online', 0, 'https://community.example/ka-1', 2, 'AMERICAS', '2026-08-30', 'Ana', '1', '1'),
  ('KA-2', 'Rotate vault keys', 'Ben', 'EMEA', 10, '2026-09-10', 10, 'How To', 'Online', 0, NULL, 0, 'EMEA', '2026-09-01 08:00:00', 'Ben', 'true', 'TRUE'),
  ('KA-2', 'Rotate vault keys', 'Ben', 'EMEA', 10, '2026-09-10', 10, 'How To', 'Online', 0, NULL, 0, 'EMEA', '2026-09-01 08:00:00', 'Ben', 'true', 'TRUE'),
  ('KA-3', 'Agent install fails', 'Chen', 'APJ', 5, '2026-09-12T09:30:00', 6, 'Technical Issue', 'Online', 0, NULL, 1, 'APJ', '2026-09-05', 'Chen', '1', '1'),
  ('KA-4', 'Sync connector', '  ', 'AMERICAS', 0, '2026-09-20', 30, 'FAQ', 'Draft', 0, NULL, 0, 'AMERICAS', '2026-09-15', 'BI Integration', '0', '1'),
  ('KA-5', 'Legacy policy', 'Dee', 'EMEA', 3, '2026-09-25', 2, 'FAQ', 'Online', 1, NULL, 0, 'EMEA', '2026-09-20', 'Dee', '1', '0'),
  ('KA-6', 'Old article', 'Eli', 'APJ', 8, '2026-07-15', 12, 'FAQ', 'Online', 0, NULL, 0, 'APJ', '2026-07-01', 'Eli', '1', '1');

CREATE TABLE SUPPORT_CASES_T (
  CASE_NUMBER TEXT,
  CREATED_DATE TEXT,
  CLOSED_DATE TEXT,
  REGION TEXT,
  PRODUCT TEXT,
  OWNER_NAME TEXT,
  CREATED_BY_REGION TEXT,
  AGE INTEGER,
  CUSTOMER_ACCOUNT_REGION TEXT,
  ATTACHED_ARTICLE_COUNT INTEGER,
  CLOSE_REASON TEXT,
  STATUS TEXT,
  RECORD_TYPE TEXT,
  OWNER_ROLE TEXT,
  OWNER_COMPANY TEXT
);

INSERT INTO SUPPORT_CASES_T VALUES
  ('C-1001', '2026-09-02', '2026-09-04', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 2, 'AMERICAS', 1, 'Solved by existing article', 'Closed', 'External', 'Support Engineer', 'Solugenix'),
  ('C-1002', '2026-09-03', '2026-09-09', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 6, 'AMERICAS', 0, 'Not Applicable', 'Closed', 'External', 'Support Engineer', 'Acme'),
  ('C-1003', '2026-09-05', '2026-09-16', ' emea ', 'EPM', 'Ben', 'EMEA', 11, 'EMEA', 1, ' Article Created ', 'Closed', 'External', 'EPM Specialist', 'Helpware'),
  ('C-1004', '2026-09-10', '2026-09-23', 'EMEA', 'EPM', 'Ben', 'EMEA', 13, 'EMEA', 0, NULL, 'Closed', 'External', 'Support Engineer', 'Helpware'),
  ('C-1005', '2026-09-11', '2026-09-29', 'APJ', 'Vault', 'Chen', 'APJ', 18, 'APJ', 1, 'Article Updated', 'Closed – Purged', 'External', 'Support Engineer', 'Solugenix'),
  ('C-1006', '2026-09-12', '2026-09-30 18:45:00', 'APJ', 'Vault', 'Chen', 'APJ', 18, 'APJ', 1, 'Solved by existing doc', 'Closed', 'External', 'Idaptive Tier 1', 'Solugenix'),
  ('C-1007', '2026-09-14', '2026-09-15', 'ADMIN LAND (TEST)', 'PAM', 'Ops', NULL, 1, NULL, 0, 'Article Flagged', 'Closed', 'External', 'Support Engineer', NULL),
  ('C-1008', '2026-09-15', '2026-09-18', 'AMERICAS', 'PAM', 'Queue', 'AMERICAS', 3, 'AMERICAS', 0, 'Solved by existing article', 'Closed', 'License', 'Queue – Sales Ops', NULL),
  ('C-1001', '2026-09-02', '2026-09-04', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 2, 'AMERICAS', 1, 'Solved by existing article', 'Closed', 'External', 'Support Engineer', 'Solugenix'),
  ('C-1009', '2026-08-05', '2026-08-10', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 5, 'AMERICAS', 1, 'Article Created', 'Closed', 'External', 'Support', 'Acme'),
  ('C-1010', '2026-07-20', '2026-08-02', 'EMEA', 'EPM', 'Ben', 'EMEA', 13, 'EMEA', 0, 'Duplicate', 'Closed', 'External', 'Support', 'Acme'),
  ('C-1099', '2026-10-01', '2026-10-02', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 1, 'AMERICAS', 1, 'Article Created', 'Closed', 'External', 'Support Engineer', 'Acme'),
  ('C-1100', '2026-04-01', '2026-04-20', 'AMERICAS', 'PAM', 'Ana', 'AMERICAS', 19, 'AMERICAS', 0, 'Article Created', 'Closed', 'External', 'Support Engineer', 'Acme');
";
