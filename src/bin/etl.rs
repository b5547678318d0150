//! Loads the staging tables, then populates the fact and dimension tables.

fn main() {
    sparkify_dwh::app::main_with("etl", sparkify_dwh::app::etl);
}
