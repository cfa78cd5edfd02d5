pub mod ics2000;
