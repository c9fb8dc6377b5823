mod support;
mod test_access_token;
mod test_fsm;
mod test_server;
