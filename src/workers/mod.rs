pub mod lock_sweep_worker;
