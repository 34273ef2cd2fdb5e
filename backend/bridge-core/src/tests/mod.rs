mod connection_state;
mod dispatch;
mod naming;
mod registry;
