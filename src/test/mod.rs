mod echo_apps;
mod flow_monitor;
mod runner;
mod viz_meta;
