use crate::domain::model::DEFAULT_QUESTION;

pub struct PromptCategory {
    pub category: &'static str,
    pub templates: &'static [&'static str],
}

pub const PROMPT_TEMPLATES: &[PromptCategory] = &[
    PromptCategory {
        category: "风景类",
        templates: &[
            "美丽的自然风景，山川河流，蓝天白云，油画风格，高分辨率",
            "夕阳西下的海滩，金色光线，浪漫氛围，摄影级画质",
            "神秘的森林，阳光透过树叶，魔幻氛围，数字艺术",
        ],
    },
    PromptCategory {
        category: "人物类",
        templates: &[
            "美丽的女孩，长发飘逸，温柔笑容，动漫风格，高品质",
            "英俊的男性，现代服装，自信表情，写实风格",
            "可爱的小孩，天真笑容，温暖色调，儿童插画风格",
        ],
    },
    PromptCategory {
        category: "科幻类",
        templates: &[
            "未来城市，科技感建筑，霓虹灯光，赛博朋克风格",
            "宇宙星空，星际飞船，神秘星球，科幻电影质感",
            "机器人，人工智能，未来科技，金属质感，3D渲染",
        ],
    },
    PromptCategory {
        category: "艺术类",
        templates: &[
            "抽象艺术，色彩丰富，几何图形，现代艺术风格",
            "水彩画风格，柔和色调，梦幻效果，艺术插画",
            "油画风格，厚重笔触，经典艺术，大师级作品",
        ],
    },
];

pub const PRESET_QUESTIONS: &[&str] = &[
    DEFAULT_QUESTION,
    "这张图片的主要内容是什么？",
    "图片中有哪些人物或动物？",
    "请分析图片的风格和色调。",
    "图片中的文字内容是什么？",
    "这张图片拍摄的地点可能在哪里？",
    "图片表达了什么情感或氛围？",
];

/// Looks up a template by its 1-based position in the flattened list.
pub fn template_by_index(index: usize) -> Option<&'static str> {
    PROMPT_TEMPLATES
        .iter()
        .flat_map(|category| category.templates.iter().copied())
        .nth(index.checked_sub(1)?)
}
