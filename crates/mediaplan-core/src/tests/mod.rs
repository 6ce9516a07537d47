mod interval;
mod select;
