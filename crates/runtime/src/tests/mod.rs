mod active;
mod work;
