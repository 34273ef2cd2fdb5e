mod fixtures;
mod scenario_store;
