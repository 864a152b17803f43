pub mod api;
pub mod crm;
pub mod doc;
pub mod time;


#[cfg(test)]
#[path = "crm_test.rs"]
mod crm_test;


#[cfg(test)]
#[path = "time_test.rs"]
mod time_test;

#[cfg(test)]
pub(crate) mod test_server;
