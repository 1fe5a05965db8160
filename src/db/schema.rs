pub const SCHEMA: &str = r#"
-- Stores: one row per retail store under audit
CREATE TABLE IF NOT EXISTS stores (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    address TEXT NOT NULL,

    -- Blob key of the floor-plan image, not a URL
    floor_plan_path TEXT,

    manager TEXT,
    phone TEXT,

    last_edited_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Locations: percentage-positioned markers on a store's floor plan
CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    store_id TEXT NOT NULL,
    name TEXT NOT NULL,
    x REAL NOT NULL,   -- percentage in [0, 100]
    y REAL NOT NULL,   -- percentage in [0, 100]
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (store_id) REFERENCES stores(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_locations_store ON locations(store_id);

-- Measurement data: at most one record per location, upserted whole
CREATE TABLE IF NOT EXISTS location_data (
    id TEXT PRIMARY KEY,
    location_id TEXT NOT NULL UNIQUE,
    measurement_type TEXT NOT NULL,  -- 'column', 'mirror_door', 'wall'
    measurements TEXT NOT NULL,      -- JSON, shape keyed by measurement_type
    notes TEXT,
    last_audit_date TEXT,            -- free text, not validated
    last_install_date TEXT,          -- free text, not validated
    last_edited_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE CASCADE
);

-- Photos attached to a location
CREATE TABLE IF NOT EXISTS photos (
    id TEXT PRIMARY KEY,
    location_id TEXT NOT NULL,
    kind TEXT NOT NULL,              -- 'audit', 'install', 'brief'
    storage_path TEXT NOT NULL,      -- blob key of the full image
    thumbnail_path TEXT NOT NULL,    -- blob key of the thumbnail
    uploaded_by TEXT,
    uploaded_at TEXT NOT NULL,
    FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_photos_location ON photos(location_id);
CREATE INDEX IF NOT EXISTS idx_photos_location_kind ON photos(location_id, kind);
"#;

/// Idempotent column additions for databases created by earlier builds.
/// Failures (column already exists) are ignored by the runner.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE stores ADD COLUMN manager TEXT",
    "ALTER TABLE stores ADD COLUMN phone TEXT",
    "ALTER TABLE location_data ADD COLUMN last_install_date TEXT",
];
