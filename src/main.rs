use anyhow::Result;
use raybounce::postprocess::PostProcess;
use raybounce::settings;

fn main() -> Result<()> {
    env_logger::init();

    let settings = settings::load_config()?;
    println!("{}", settings);

    let mut postprocess = PostProcess::new(settings)?;
    postprocess.run()?;
    postprocess.writeup()?;

    if let Some(data) = &postprocess.data {
        println!("{}", data.stats);
    }
    Ok(())
}
