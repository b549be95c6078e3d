pub use log::debug;

/// Print a debug message through one of two routes:
/// (1) The global debug log level, activated by the --debug flag
/// (2) A local debug flag, used to trace a single function while developing
///
/// The local debug flag is given as the first argument. When it is set, the message is written
/// directly to stderr regardless of the log level.
///
/// # Examples
///
/// ```ignore
/// debug_msg!(false, "Segmenting interval {}-{}", start, end); // logged only with --debug
/// debug_msg!(true, "Segmenting interval {}-{}", start, end); // always printed to stderr
/// ```
macro_rules! debug_msg {
    ($flag:expr, $($arg:tt)+) => {
        if $flag {
            eprintln!($($arg)+);
        } else {
            $crate::log_utils::debug!($($arg)+);
        }
    }
}

pub(crate) use debug_msg;
