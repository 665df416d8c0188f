use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg}: {wide_bar} {pos}/{len} [{elapsed_precise}<{eta_precise}]";

pub fn bar(len: usize, msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(msg);
    pb
}
