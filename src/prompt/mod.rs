//! Prompt builder: pure functions from session inputs to model instructions.

pub const DEFAULT_OBJECTIVE: &str =
    "Develop a comprehensive, end-to-end exploratory analysis of the dataset";

/// System rules for the code-generating model. Plain-text-only output so
/// the sandbox can run the reply verbatim.
pub fn system_rules(plots_dir: &str) -> String {
    format!(
        "You are an expert data analyst writing Python for a specific dataset.\n\
         Provide only Python code as output without any description.\n\
         Provide only code in plain text format without Markdown formatting.\n\
         Do not include symbols such as ``` or ```python.\n\
         The code must be complete and ready to execute without modification.\n\
         Import every library you use (pandas, numpy, matplotlib, seaborn, scipy, sklearn).\n\
         Use a non-interactive matplotlib backend; save every figure into the '{plots_dir}' \
         directory with a descriptive filename, dpi=300 and tight_layout(), and close it after saving.\n\
         Do not use inplace=True in pandas operations; use assignment instead.\n\
         Convert numeric fields safely with pd.to_numeric(errors='coerce') and handle missing values.\n\
         Avoid multiprocessing, threading and concurrent.futures; prefer vectorized pandas/numpy operations.\n\
         Print a summary of findings to stdout."
    )
}

/// The opening user message of a session.
pub fn analysis_prompt(
    profile: &str,
    objective: &str,
    hardware: &str,
    data_path: &str,
    plots_dir: &str,
) -> String {
    format!(
        "Objective:\n{objective}\n\n\
         Dataset profile:\n{profile}\n\
         The dataset file is at '{data_path}' (the same path is exported as the \
         DATASET_PATH environment variable). Load it from that path; do not fabricate data.\n\
         Save all plots into the '{plots_dir}' directory.\n\n\
         Hardware available:\n{hardware}\n"
    )
}

/// Feedback message for a failed attempt: the captured error plus any
/// pattern-matched guidance.
pub fn repair_feedback(error_text: &str) -> String {
    let mut out = String::from("The previous code failed when executed. Error output:\n\n");
    out.push_str(error_text);
    out.push('\n');
    let hints = diagnose(error_text);
    if !hints.is_empty() {
        out.push_str("\nGuidance:\n");
        for hint in hints {
            out.push_str("- ");
            out.push_str(hint);
            out.push('\n');
        }
    }
    out.push_str("\nReturn a corrected, complete Python script that addresses every issue above. Output only code.");
    out
}

/// Rules for the optional post-success narrative summary.
pub fn summary_rules() -> &'static str {
    "You are a data analyst writing up results for a colleague.\n\
     Summarize the analysis output below as Markdown with three sections: \
     Summary, Key Insights, Recommendations.\n\
     Base every claim on the captured output; do not invent numbers.\n\
     Mention the generated plot files by name where they support an insight.\n\
     Do not include any code."
}

/// User message for the summary call: the objective plus what the final
/// attempt actually printed and produced.
pub fn summary_request(objective: &str, output: &str, artifacts: &[String]) -> String {
    let plots = if artifacts.is_empty() {
        "none".to_string()
    } else {
        artifacts.join(", ")
    };
    format!(
        "Objective:\n{objective}\n\n\
         Captured analysis output:\n{output}\n\n\
         Generated plot files: {plots}\n"
    )
}

/// Map well-known interpreter error patterns to targeted fix guidance.
pub fn diagnose(stderr: &str) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if stderr.contains("inplace") {
        hints.push(
            "Replace inplace=True pandas operations with assignment, e.g. df = df.dropna() \
             instead of df.dropna(inplace=True).",
        );
    }
    if stderr.contains("could not convert string to float") {
        hints.push(
            "Convert numeric columns with pd.to_numeric(errors='coerce') and handle the \
             resulting missing values before computing.",
        );
    }
    if stderr.contains("ModuleNotFoundError") || stderr.contains("ImportError") {
        hints.push(
            "An import failed. Check the import statements for typos and only use commonly \
             installed libraries (pandas, numpy, matplotlib, seaborn, scipy, sklearn).",
        );
    }
    if stderr.contains("SyntaxError") {
        hints.push(
            "Fix the syntax error: check parentheses, brackets, colons and indentation near \
             the reported line.",
        );
    }
    if stderr.contains("KeyError") {
        hints.push(
            "A referenced column or key does not exist. Use the exact, case-sensitive column \
             names from the dataset profile.",
        );
    }
    if stderr.contains("FileNotFoundError") {
        hints.push(
            "A file path is wrong. Load the dataset only from the path given in the prompt.",
        );
    }
    if stderr.contains("TypeError") && stderr.contains("NoneType") {
        hints.push(
            "An operation ran on a None value. Check function return values before using them.",
        );
    }
    if stderr.contains("Feature names") {
        hints.push(
            "Prediction features must match the columns the model was trained with, including \
             any encoded features.",
        );
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_produces_a_prompt() {
        // Total on empty inputs, no panics.
        let p = analysis_prompt("", "", "", "", "");
        assert!(p.contains("Objective:"));
        assert!(p.contains("Hardware available:"));
    }

    #[test]
    fn prompt_embeds_inputs() {
        let p = analysis_prompt("3 columns", "find correlations", "1 CPU", "data/x.csv", "eda_plots");
        assert!(p.contains("find correlations"));
        assert!(p.contains("3 columns"));
        assert!(p.contains("data/x.csv"));
        assert!(p.contains("eda_plots"));
    }

    #[test]
    fn diagnose_matches_known_patterns() {
        let hints = diagnose("Traceback...\nKeyError: 'revenue'\n");
        assert_eq!(hints.len(), 1);
        assert!(hints[0].contains("column"));
        assert!(diagnose("clean run").is_empty());
    }

    #[test]
    fn repair_feedback_carries_error_and_guidance() {
        let fb = repair_feedback("SyntaxError: invalid syntax");
        assert!(fb.contains("SyntaxError: invalid syntax"));
        assert!(fb.contains("Guidance:"));
        assert!(fb.contains("Output only code."));
    }
}
