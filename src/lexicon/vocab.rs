//! Fixed per-domain vocabularies and table schemas.
//!
//! Everything here is deployment-time data: the tables each dataset ships
//! with, the canonical metric/gas/incident identifiers, their surface forms
//! and units. Location vocabularies can additionally be seeded at startup
//! from distinct values read out of the dataset.

use crate::domain::Domain;

use super::registry::{Category, Lexicon, LexiconBuilder};
use super::schema::{ColumnDef, ColumnType, TableSchema};

/// Build the full lexicon for a domain.
pub fn lexicon_for(domain: Domain, threshold: f64, margin: f64) -> Lexicon {
    builder_for(domain, threshold, margin).build()
}

/// Build the lexicon builder for a domain, left open so callers can seed
/// additional location surfaces (e.g. distinct city names) before `build`.
pub fn builder_for(domain: Domain, threshold: f64, margin: f64) -> LexiconBuilder {
    let builder = Lexicon::builder()
        .similarity_threshold(threshold)
        .ambiguity_margin(margin);
    match domain {
        Domain::DisasterCosts => disaster_costs(builder),
        Domain::Assistance => assistance(builder),
        Domain::Reanalysis => reanalysis(builder),
        Domain::Emissions => emissions(builder),
    }
}

// === Disaster costs (billion-dollar events, one row per year) ===

const COSTS_TABLE: &str = "disaster_records";

/// Per-event-type column stems in the costs table; each stem has a
/// `<stem> Count` and a `<stem> Cost` column.
pub const COST_EVENT_TYPES: [&str; 7] = [
    "Drought",
    "Flooding",
    "Freeze",
    "Severe Storm",
    "Tropical Cyclone",
    "Wildfire",
    "Winter Storm",
];

fn disaster_costs(builder: LexiconBuilder) -> LexiconBuilder {
    let mut columns = vec![ColumnDef::new("Year", ColumnType::Year)];
    for stem in COST_EVENT_TYPES {
        columns.push(ColumnDef::new(format!("{stem} Count"), ColumnType::Integer));
        columns.push(ColumnDef::new(format!("{stem} Cost"), ColumnType::Real));
    }
    columns.push(ColumnDef::new("Total_Disaster_Count", ColumnType::Integer));
    columns.push(ColumnDef::new("Total_Disaster_Cost", ColumnType::Real));

    builder
        .table(TableSchema::new(COSTS_TABLE, columns))
        .entry(
            Category::IncidentType,
            "Drought",
            &["droughts", "dry spell"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Flooding",
            &["flood", "floods", "floodings"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Freeze",
            &["freezes", "freezing", "frost"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Severe Storm",
            &["severe storms", "storm", "storms", "thunderstorm"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Tropical Cyclone",
            &[
                "tropical cyclones",
                "hurricane",
                "hurricanes",
                "cyclone",
                "cyclones",
                "typhoon",
            ],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Wildfire",
            &["wildfires", "fire", "fires", "forest fire"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Winter Storm",
            &["winter storms", "snowstorm", "snow storm", "blizzard"],
            &[COSTS_TABLE],
        )
        .entry(
            Category::IncidentType,
            "Total",
            &["all disasters", "total disasters", "disasters overall"],
            &[COSTS_TABLE],
        )
        .measure(
            Category::Metric,
            "Cost",
            &["costs", "damage", "damages", "dollar cost", "price"],
            &[COSTS_TABLE],
            None,
            "$ billion",
        )
        .measure(
            Category::Metric,
            "Count",
            &["counts", "number", "events", "occurrences"],
            &[COSTS_TABLE],
            None,
            "events",
        )
}

// === FEMA/HUD disaster assistance ===

const ASSISTANCE_TABLE: &str = "disaster_dollar_db";

fn assistance(builder: LexiconBuilder) -> LexiconBuilder {
    let schema = TableSchema::new(
        ASSISTANCE_TABLE,
        vec![
            ColumnDef::new("year", ColumnType::Year),
            ColumnDef::new("event", ColumnType::Text),
            ColumnDef::new("incident_number", ColumnType::Integer),
            ColumnDef::new("incident_start", ColumnType::Text),
            ColumnDef::new("incident_end", ColumnType::Text),
            ColumnDef::new("state", ColumnType::Text),
            ColumnDef::new("incident_type", ColumnType::Text),
            ColumnDef::new("valid_ihp_applications", ColumnType::Integer),
            ColumnDef::new("eligible_ihp_applications", ColumnType::Integer),
            ColumnDef::new("ihp_total", ColumnType::Real),
            ColumnDef::new("pa_total", ColumnType::Real),
            ColumnDef::new("pa_projects_count", ColumnType::Integer),
            ColumnDef::new("cdbg_dr_allocation", ColumnType::Real),
        ],
    );

    let mut builder = builder
        .table(schema)
        .measure(
            Category::Metric,
            "ihp_total",
            &[
                "ihp total",
                "ihp",
                "individual and households program total",
                "individual assistance",
            ],
            &[ASSISTANCE_TABLE],
            Some("ihp_total"),
            "$",
        )
        .measure(
            Category::Metric,
            "pa_total",
            &["pa total", "public assistance total", "public assistance"],
            &[ASSISTANCE_TABLE],
            Some("pa_total"),
            "$",
        )
        .measure(
            Category::Metric,
            "pa_projects_count",
            &["pa projects", "public assistance projects count", "pa projects count"],
            &[ASSISTANCE_TABLE],
            Some("pa_projects_count"),
            "projects",
        )
        .measure(
            Category::Metric,
            "cdbg_dr_allocation",
            &[
                "cdbg dr allocation",
                "cdbg-dr",
                "community development block grant disaster recovery allocation",
                "block grant allocation",
            ],
            &[ASSISTANCE_TABLE],
            Some("cdbg_dr_allocation"),
            "$",
        )
        .measure(
            Category::Metric,
            "valid_ihp_applications",
            &["valid ihp applications", "valid applications"],
            &[ASSISTANCE_TABLE],
            Some("valid_ihp_applications"),
            "applications",
        )
        .measure(
            Category::Metric,
            "eligible_ihp_applications",
            &["eligible ihp applications", "eligible applications"],
            &[ASSISTANCE_TABLE],
            Some("eligible_ihp_applications"),
            "applications",
        );

    for (canonical, aliases) in ASSISTANCE_INCIDENT_TYPES {
        builder = builder.entry(Category::IncidentType, *canonical, aliases, &[ASSISTANCE_TABLE]);
    }
    for (abbr, name) in US_STATES {
        builder = builder.entry(Category::Location, *abbr, &[name], &[ASSISTANCE_TABLE]);
    }
    builder
}

/// Incident-type values stored in the assistance table, with question-side
/// aliases.
const ASSISTANCE_INCIDENT_TYPES: &[(&str, &[&str])] = &[
    ("Coastal Storm", &["coastal storms"]),
    ("Dam or Levee Break", &["dam break", "levee break"]),
    ("Dam/Levee Break", &[]),
    ("Earthquake", &["earthquakes", "quake"]),
    ("Fire", &["fires", "wildfire", "wildfires"]),
    ("Flood", &["floods", "flooding"]),
    ("Freezing", &["freeze", "frost"]),
    ("Hurricane", &["hurricanes"]),
    ("Mud/Landslide", &["mudslide", "landslide", "landslides"]),
    ("Other", &[]),
    ("Severe Ice Storm", &["ice storm", "ice storms"]),
    ("Severe Storm", &["severe storms", "storms"]),
    ("Snowstorm", &["snow storm", "snowstorms"]),
    ("Straight-Line Winds", &["straight line winds"]),
    ("Tornado", &["tornadoes", "tornados", "twister"]),
    ("Tropical Storm", &["tropical storms"]),
    ("Tsunami", &["tsunamis"]),
    ("Typhoon", &["typhoons"]),
    ("Volcanic Eruption", &["volcano", "eruption"]),
    ("Winter Storm", &["winter storms", "blizzard"]),
];

/// State abbreviation stored in the table, full name as the spoken surface.
const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

// === ERA5 monthly reanalysis (South Asia) ===

/// Country keys; each country ships two tables, `<key>_df0` and `<key>_df1`,
/// split by metric group.
pub const REANALYSIS_COUNTRIES: [&str; 7] = [
    "india",
    "nepal",
    "bhutan",
    "pakistan",
    "bangladesh",
    "srilanka",
    "afghanistan",
];

const DF0_METRICS: &[(&str, &[&str], &str)] = &[
    ("high_vegetation_cover", &["vegetation", "vegetation cover"], "fraction"),
    ("surface_pressure", &["pressure", "air pressure"], "Pa"),
    ("total_ozone", &["ozone"], "atm-cm"),
    ("wind_speed", &["wind", "winds"], "m/s"),
    ("skin_temperature", &["temperature", "surface temperature"], "K"),
];

const DF1_METRICS: &[(&str, &[&str], &str)] = &[
    ("uv_radiation", &["uv", "ultraviolet", "ultraviolet radiation"], "W/m²"),
    ("snowfall", &["snow"], "m"),
    ("net_thermal_radiation", &["thermal radiation"], "W/m²"),
    ("total_precipitation", &["precipitation", "rainfall", "rain"], "m"),
    ("convective_rain_rate", &["convective rain"], "kg/m²/s"),
    ("mean_evaporation_rate", &["evaporation", "evaporation rate"], "kg/m²/s"),
    ("mean_moisture_divergence", &["moisture divergence"], "kg/m²/s"),
    ("mean_precipitation_rate", &["precipitation rate"], "kg/m²/s"),
];

/// Static seed cities; the store can widen these with distinct city names
/// read from the dataset at startup.
const REANALYSIS_CITIES: &[(&str, &[&str])] = &[
    (
        "india",
        &[
            "Delhi", "Mumbai", "Kolkata", "Chennai", "Bengaluru", "Hyderabad", "Ahmedabad",
            "Jaipur", "Lucknow", "Pune",
        ],
    ),
    ("nepal", &["Kathmandu", "Pokhara", "Lalitpur", "Biratnagar"]),
    ("bhutan", &["Thimphu", "Phuntsholing", "Paro"]),
    (
        "pakistan",
        &["Karachi", "Lahore", "Islamabad", "Faisalabad", "Rawalpindi", "Peshawar", "Quetta"],
    ),
    ("bangladesh", &["Dhaka", "Chittagong", "Khulna", "Sylhet", "Rajshahi"]),
    ("srilanka", &["Colombo", "Kandy", "Galle", "Jaffna"]),
    ("afghanistan", &["Kabul", "Kandahar", "Herat", "Mazar-i-Sharif", "Jalalabad"]),
];

fn reanalysis_schema(country: &str, suffix: &str, metrics: &[(&str, &[&str], &str)]) -> TableSchema {
    let mut columns = vec![
        ColumnDef::new("City", ColumnType::Text),
        ColumnDef::new("date", ColumnType::DateText),
        ColumnDef::new("latitude", ColumnType::Real),
        ColumnDef::new("longitude", ColumnType::Real),
    ];
    for (name, _, _) in metrics {
        columns.push(ColumnDef::new(*name, ColumnType::Real));
    }
    TableSchema::new(format!("{country}_{suffix}"), columns)
}

fn reanalysis(mut builder: LexiconBuilder) -> LexiconBuilder {
    let df0_tables: Vec<String> = REANALYSIS_COUNTRIES.iter().map(|c| format!("{c}_df0")).collect();
    let df1_tables: Vec<String> = REANALYSIS_COUNTRIES.iter().map(|c| format!("{c}_df1")).collect();

    for country in REANALYSIS_COUNTRIES {
        builder = builder
            .table(reanalysis_schema(country, "df0", DF0_METRICS))
            .table(reanalysis_schema(country, "df1", DF1_METRICS));
    }

    let df0_refs: Vec<&str> = df0_tables.iter().map(String::as_str).collect();
    for (column, aliases, unit) in DF0_METRICS {
        builder = builder.measure(Category::Metric, column, aliases, &df0_refs, Some(column), unit);
    }
    let df1_refs: Vec<&str> = df1_tables.iter().map(String::as_str).collect();
    for (column, aliases, unit) in DF1_METRICS {
        builder = builder.measure(Category::Metric, column, aliases, &df1_refs, Some(column), unit);
    }

    for (country, cities) in REANALYSIS_CITIES {
        let tables = [format!("{country}_df0"), format!("{country}_df1")];
        let table_refs: Vec<&str> = tables.iter().map(String::as_str).collect();
        for city in *cities {
            builder = builder.entry(Category::Location, *city, &[], &table_refs);
        }
    }
    builder
}

// === EDGAR greenhouse-gas emissions (wide year-column tables) ===

pub const EMISSION_TABLES: [&str; 4] = [
    "co2_emissions",
    "ch4_emissions",
    "n2o_emissions",
    "fluorinated_emissions",
];

const EMISSION_GASES: &[(&str, &[&str], &str)] = &[
    ("co2_emissions", &["co2", "carbon dioxide", "carbon dioxide emissions"], "Mt CO₂"),
    ("ch4_emissions", &["ch4", "methane", "methane emissions"], "Mt CH₄"),
    ("n2o_emissions", &["n2o", "nitrous oxide", "nitrous oxide emissions"], "kt N₂O"),
    (
        "fluorinated_emissions",
        &["fluorinated", "fluorinated gases", "f-gases", "hfcs", "pfcs", "sf6", "nf3"],
        "kt CO₂eq",
    ),
];

/// Seed countries with their ISO 3166-1 alpha-3 codes; the full set of names
/// stored in the dataset is seeded from `distinct_values` at startup.
const EMISSION_COUNTRIES: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("China", "CHN"),
    ("India", "IND"),
    ("Russia", "RUS"),
    ("Japan", "JPN"),
    ("Germany", "DEU"),
    ("Brazil", "BRA"),
    ("Indonesia", "IDN"),
    ("Iran", "IRN"),
    ("Canada", "CAN"),
    ("Mexico", "MEX"),
    ("Saudi Arabia", "SAU"),
    ("South Korea", "KOR"),
    ("Australia", "AUS"),
    ("South Africa", "ZAF"),
    ("United Kingdom", "GBR"),
    ("France", "FRA"),
    ("Italy", "ITA"),
    ("Spain", "ESP"),
    ("Poland", "POL"),
    ("Ukraine", "UKR"),
    ("Turkey", "TUR"),
    ("Pakistan", "PAK"),
    ("Bangladesh", "BGD"),
    ("Nigeria", "NGA"),
    ("Egypt", "EGY"),
    ("Argentina", "ARG"),
    ("Vietnam", "VNM"),
    ("Thailand", "THA"),
    ("Malaysia", "MYS"),
    ("Philippines", "PHL"),
    ("Netherlands", "NLD"),
    ("Belgium", "BEL"),
    ("Sweden", "SWE"),
    ("Norway", "NOR"),
    ("Finland", "FIN"),
    ("Denmark", "DNK"),
    ("Switzerland", "CHE"),
    ("Austria", "AUT"),
    ("Greece", "GRC"),
    ("Portugal", "PRT"),
    ("Czechia", "CZE"),
    ("Romania", "ROU"),
    ("Chile", "CHL"),
    ("Colombia", "COL"),
    ("Peru", "PER"),
    ("Venezuela", "VEN"),
    ("Iraq", "IRQ"),
    ("Kazakhstan", "KAZ"),
    ("Algeria", "DZA"),
    ("Morocco", "MAR"),
    ("Ethiopia", "ETH"),
    ("Kenya", "KEN"),
    ("New Zealand", "NZL"),
    ("Israel", "ISR"),
    ("United Arab Emirates", "ARE"),
    ("Qatar", "QAT"),
    ("Kuwait", "KWT"),
    ("Singapore", "SGP"),
    ("Afghanistan", "AFG"),
    ("Nepal", "NPL"),
    ("Sri Lanka", "LKA"),
];

fn emissions_schema(table: &str) -> TableSchema {
    let mut columns = vec![
        ColumnDef::new("Name", ColumnType::Text),
        ColumnDef::new("Country_code_A3", ColumnType::Text),
        ColumnDef::new("Substance", ColumnType::Text),
    ];
    let (start, end) = Domain::Emissions.year_bounds();
    for year in start..=end {
        columns.push(ColumnDef::new(year.to_string(), ColumnType::YearColumn));
    }
    TableSchema::new(table, columns)
}

fn emissions(mut builder: LexiconBuilder) -> LexiconBuilder {
    for table in EMISSION_TABLES {
        builder = builder.table(emissions_schema(table));
    }
    for (table, aliases, unit) in EMISSION_GASES {
        builder = builder.measure(Category::Gas, table, aliases, &[table], None, unit);
    }
    for (name, code) in EMISSION_COUNTRIES {
        builder = builder.entry(Category::Location, *name, &[code], &EMISSION_TABLES);
    }
    builder
}
