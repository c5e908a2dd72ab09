use color_print::cprintln;

/// Function that prints an informational message.
pub fn info(message: &str) {
    cprintln!("<green, bold>[INFO]</green, bold> {}", message);
}

/// Function that prints an error message.
pub fn error(message: &str) {
    cprintln!("<red, bold>[ERROR]</red, bold> {}", message);
}

/// Function that prints a debug message.
pub fn debug(message: &str) {
    cprintln!("<blue, bold>[DEBUG]</blue, bold> {}", message);
}
