mod files;
mod harness;
