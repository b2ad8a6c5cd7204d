pub mod trace_sink;
