pub mod ber;
pub mod snmp;
