mod config_load;
mod estop_recovery;
mod homing_cycle;
