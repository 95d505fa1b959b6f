mod activity_logs;
mod residents;
