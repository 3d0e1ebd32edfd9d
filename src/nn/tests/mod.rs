mod init;
mod optimizer;
mod trainer;
